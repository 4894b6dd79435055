//! Error types for trigger-core operations.

use std::path::PathBuf;

/// All errors that can occur while driving the trigger lifecycle.
///
/// Three classes matter to the host: missing hardware and a failed liveness
/// scheduler are fatal (see [`TriggerError::is_fatal`]); everything else is
/// reported and the state machine keeps running.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Required hardware unavailable: {capability}: {details}")]
    MissingHardware {
        capability: &'static str,
        details: String,
    },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Scheduling Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Periodic rearm registration failed: {details}")]
    Scheduling { details: String },

    #[error("Motion watch re-registration failed: {details}")]
    Rearm { details: String },

    #[error("Sampling window could not start: {details}")]
    WindowStart { details: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sample recorder used before start()")]
    RecorderNotStarted,
}

impl TriggerError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        TriggerError::Io {
            context: context.into(),
            source,
        }
    }

    /// Fatal errors defeat detection entirely; the host should stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TriggerError::MissingHardware { .. }
                | TriggerError::ConfigMalformed { .. }
                | TriggerError::Scheduling { .. }
        )
    }
}

/// Convenience type alias for Results using TriggerError.
pub type Result<T> = std::result::Result<T, TriggerError>;

impl From<TriggerError> for String {
    fn from(err: TriggerError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classes() {
        let missing = TriggerError::MissingHardware {
            capability: "motion trigger",
            details: "no device".to_string(),
        };
        let scheduling = TriggerError::Scheduling {
            details: "refused".to_string(),
        };
        let io = TriggerError::io(
            "append Log.txt",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        let window = TriggerError::WindowStart {
            details: "accelerometer busy".to_string(),
        };

        assert!(missing.is_fatal());
        assert!(scheduling.is_fatal());
        assert!(!io.is_fatal());
        assert!(!window.is_fatal());
    }

    #[test]
    fn io_error_message_carries_context() {
        let err = TriggerError::io(
            "append data.txt",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert_eq!(err.to_string(), "I/O error: append data.txt: disk full");
    }
}
