//! Append-only lifecycle event log (`Log.txt`).

use fs_err::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, TriggerError};
use crate::types::Event;

pub const EVENT_LOG_HEADER: &str = "real_time_ms,event\n";

/// Write-ahead audit trail of lifecycle events.
///
/// Entries are never rewritten or truncated; the file is opened in append
/// mode and each record is a single `write_all`. There is no read API.
pub struct EventLog {
    file: File,
    path: PathBuf,
    entries: u64,
}

impl EventLog {
    /// Opens (or creates) the log and writes the header if the file is empty.
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| TriggerError::io("open event log", err))?;

        let len = file
            .metadata()
            .map_err(|err| TriggerError::io("stat event log", err))?
            .len();
        if len == 0 {
            file.write_all(EVENT_LOG_HEADER.as_bytes())
                .map_err(|err| TriggerError::io("write event log header", err))?;
        }

        Ok(EventLog {
            file,
            path: path.to_path_buf(),
            entries: 0,
        })
    }

    pub fn record(&mut self, timestamp_ms: i64, label: &str) -> Result<()> {
        let event = Event::new(timestamp_ms, label);
        self.file
            .write_all(event.to_line().as_bytes())
            .map_err(|err| TriggerError::io("append event log", err))?;
        self.entries += 1;
        tracing::debug!(timestamp_ms, label = %event.label, "Event logged");
        Ok(())
    }

    /// Events successfully appended by this handle.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_then_one_line_per_event() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("Log.txt");

        let mut log = EventLog::create(&path).expect("create log");
        log.record(1000, "session start").expect("record");
        log.record(2000, "trigger fired").expect("record");

        let content = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(
            content,
            "real_time_ms,event\n1000,session start\n2000,trigger fired\n"
        );
        assert_eq!(log.entries(), 2);
    }

    #[test]
    fn reopen_appends_without_second_header() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("Log.txt");

        {
            let mut log = EventLog::create(&path).expect("create log");
            log.record(1, "first").expect("record");
        }
        let mut log = EventLog::create(&path).expect("reopen log");
        log.record(2, "second").expect("record");

        let content = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(content, "real_time_ms,event\n1,first\n2,second\n");
    }

    #[test]
    fn missing_directory_is_io_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("gone").join("Log.txt");

        match EventLog::create(&path) {
            Err(TriggerError::Io { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an I/O error"),
        }
    }
}
