//! Append-only accelerometer sample file (`data.txt`) with a running count.

use fs_err::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, TriggerError};
use crate::types::Sample;

pub const SAMPLE_HEADER: &str = "timestamp,x,y,z,real_time_ms\n";

/// Owns the sample file for the whole session.
///
/// The file stays open across sampling windows and rows accumulate; nothing
/// truncates it between windows. The count covers every sample handed to
/// [`SampleRecorder::record`] this session, including rows whose append failed.
pub struct SampleRecorder {
    path: PathBuf,
    file: Option<File>,
    count: u64,
    write_failures: u64,
}

impl SampleRecorder {
    pub fn new(path: &Path) -> Self {
        SampleRecorder {
            path: path.to_path_buf(),
            file: None,
            count: 0,
            write_failures: 0,
        }
    }

    /// Opens the file and writes the header. Later calls are no-ops.
    pub fn start(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| TriggerError::io("open sample file", err))?;
        let len = file
            .metadata()
            .map_err(|err| TriggerError::io("stat sample file", err))?
            .len();
        if len == 0 {
            file.write_all(SAMPLE_HEADER.as_bytes())
                .map_err(|err| TriggerError::io("write sample header", err))?;
        }

        self.file = Some(file);
        Ok(())
    }

    /// Appends one row, returning the running count.
    pub fn record(&mut self, sample: &Sample) -> Result<u64> {
        let file = self.file.as_mut().ok_or(TriggerError::RecorderNotStarted)?;
        self.count += 1;

        if let Err(err) = file.write_all(sample.to_row().as_bytes()) {
            self.write_failures += 1;
            return Err(TriggerError::io("append sample file", err));
        }
        Ok(self.count)
    }

    /// Kept open on purpose; the next window appends to the same file.
    pub fn stop(&mut self) {}

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn is_started(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
