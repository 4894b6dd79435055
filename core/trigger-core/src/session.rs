//! Per-run session directory.
//!
//! Each process run gets one directory named after its start time:
//!
//! ```text
//! {base}/2026-10-16_09_41_07/
//! ├── Log.txt    # real_time_ms,event
//! └── data.txt   # timestamp,x,y,z,real_time_ms
//! ```
//!
//! The directory is created once and only appended into afterwards. Retention
//! is somebody else's problem: nothing here ever deletes a session.

use chrono::{DateTime, TimeZone};
use fs_err as fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, TriggerError};

pub const SESSION_DIR_FORMAT: &str = "%Y-%m-%d_%H_%M_%S";
pub const EVENT_LOG_FILE: &str = "Log.txt";
pub const SAMPLE_FILE: &str = "data.txt";

// Two runs in the same second get `_1`, `_2`, ... instead of sharing files.
const MAX_NAME_SUFFIX: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDirectory {
    name: String,
    path: PathBuf,
}

impl SessionDirectory {
    pub fn create<Tz: TimeZone>(base: &Path, started_at: DateTime<Tz>) -> Result<Self>
    where
        Tz::Offset: std::fmt::Display,
    {
        fs::create_dir_all(base)
            .map_err(|err| TriggerError::io("create session base directory", err))?;

        let stem = started_at.format(SESSION_DIR_FORMAT).to_string();
        for attempt in 0..=MAX_NAME_SUFFIX {
            let name = if attempt == 0 {
                stem.clone()
            } else {
                format!("{}_{}", stem, attempt)
            };
            let path = base.join(&name);
            match fs::create_dir(&path) {
                Ok(()) => {
                    tracing::info!(session = %name, path = %path.display(), "Session directory created");
                    return Ok(SessionDirectory { name, path });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(TriggerError::io("create session directory", err)),
            }
        }

        Err(TriggerError::io(
            "create session directory",
            std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!("all names for {} are taken", stem),
            ),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn event_log_path(&self) -> PathBuf {
        self.path.join(EVENT_LOG_FILE)
    }

    pub fn sample_path(&self) -> PathBuf {
        self.path.join(SAMPLE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn started_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 31, 9, 5, 7).unwrap()
    }

    #[test]
    fn name_follows_start_timestamp() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let session = SessionDirectory::create(temp_dir.path(), started_at()).expect("session");

        assert_eq!(session.name(), "2026-01-31_09_05_07");
        assert!(session.path().is_dir());
        assert_eq!(
            session.event_log_path(),
            temp_dir.path().join("2026-01-31_09_05_07").join("Log.txt")
        );
        assert_eq!(
            session.sample_path(),
            temp_dir.path().join("2026-01-31_09_05_07").join("data.txt")
        );
    }

    #[test]
    fn same_second_gets_suffix() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let first = SessionDirectory::create(temp_dir.path(), started_at()).expect("first");
        let second = SessionDirectory::create(temp_dir.path(), started_at()).expect("second");

        assert_ne!(first.path(), second.path());
        assert_eq!(second.name(), "2026-01-31_09_05_07_1");
    }

    #[test]
    fn creates_missing_base() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let base = temp_dir.path().join("nested").join("sessions");
        let session = SessionDirectory::create(&base, started_at()).expect("session");
        assert!(session.path().starts_with(&base));
    }
}
