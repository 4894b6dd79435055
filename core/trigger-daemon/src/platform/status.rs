//! Status file "display".
//!
//! The daemon has no screen; `~/.trigger-sensor/status.json` is rewritten
//! atomically so a shell prompt or widget can poll it.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use trigger_core::platform::Display;
use trigger_core::DisplayState;

/// Readings arrive at the sample rate; the file only needs a few updates a second.
const MIN_WRITE_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Serialize)]
struct StatusFile<'a> {
    session: &'a str,
    updated_at: String,
    #[serde(flatten)]
    state: &'a DisplayState,
}

pub struct StatusFileDisplay {
    path: PathBuf,
    session: String,
    last_write: Option<Instant>,
    last_status: Option<String>,
}

impl StatusFileDisplay {
    pub fn new(path: &Path, session: &str) -> Self {
        StatusFileDisplay {
            path: path.to_path_buf(),
            session: session.to_string(),
            last_write: None,
            last_status: None,
        }
    }

    fn due(&self, state: &DisplayState) -> bool {
        if self.last_status.as_deref() != Some(state.status.as_str()) {
            return true;
        }
        self.last_write
            .map(|at| at.elapsed() >= MIN_WRITE_INTERVAL)
            .unwrap_or(true)
    }
}

impl Display for StatusFileDisplay {
    fn show(&mut self, state: &DisplayState) {
        if !self.due(state) {
            return;
        }

        let status = StatusFile {
            session: &self.session,
            updated_at: Utc::now().to_rfc3339(),
            state,
        };
        match save_status(&self.path, &status) {
            Ok(()) => {
                self.last_write = Some(Instant::now());
                self.last_status = Some(state.status.clone());
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Status update failed");
            }
        }
    }
}

fn save_status(path: &Path, status: &StatusFile<'_>) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent).map_err(|err| err.to_string())?;
    }

    let payload = serde_json::to_vec_pretty(status)
        .map_err(|err| format!("Failed to serialize status: {}", err))?;
    let tmp_path = path.with_extension("tmp");
    fs_err::write(&tmp_path, payload).map_err(|err| err.to_string())?;
    fs_err::rename(&tmp_path, path).map_err(|err| err.to_string())?;
    Ok(())
}
