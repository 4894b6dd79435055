//! Haptic pulse and wake lock over sysfs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs_err::OpenOptions;
use trigger_core::platform::{Haptics, PlatformError, WakeLock};

const WAKE_LOCK_PATH: &str = "/sys/power/wake_lock";
const WAKE_UNLOCK_PATH: &str = "/sys/power/wake_unlock";

/// `timed_output` style vibrator: writing N to the node buzzes for N ms.
pub struct VibratorHaptics {
    device: Option<PathBuf>,
}

impl VibratorHaptics {
    pub fn new(device: Option<PathBuf>) -> Self {
        VibratorHaptics { device }
    }
}

impl Haptics for VibratorHaptics {
    fn pulse(&mut self, duration: Duration) {
        let millis = duration.as_millis();
        let Some(device) = &self.device else {
            tracing::info!(pulse_ms = millis as u64, "Window complete (no vibrator configured)");
            return;
        };

        if let Err(err) = write_node(device, &millis.to_string()) {
            tracing::warn!(device = %device.display(), error = %err, "Haptic pulse failed");
        }
    }
}

/// Linux autosleep wake lock. Disabled means every call succeeds silently.
pub struct SysfsWakeLock {
    enabled: bool,
    name: String,
    lock_path: PathBuf,
    unlock_path: PathBuf,
}

impl SysfsWakeLock {
    pub fn new(enabled: bool, name: &str) -> Self {
        SysfsWakeLock {
            enabled,
            ..Self::with_paths(name, Path::new(WAKE_LOCK_PATH), Path::new(WAKE_UNLOCK_PATH))
        }
    }

    pub fn with_paths(name: &str, lock_path: &Path, unlock_path: &Path) -> Self {
        SysfsWakeLock {
            enabled: true,
            name: name.to_string(),
            lock_path: lock_path.to_path_buf(),
            unlock_path: unlock_path.to_path_buf(),
        }
    }
}

impl WakeLock for SysfsWakeLock {
    fn acquire(&mut self) -> Result<(), PlatformError> {
        if !self.enabled {
            return Ok(());
        }
        if !self.lock_path.exists() {
            return Err(PlatformError::Unavailable(format!(
                "{} not present",
                self.lock_path.display()
            )));
        }
        write_node(&self.lock_path, &self.name).map_err(|err| PlatformError::Failed(err.to_string()))
    }

    fn release(&mut self) {
        if !self.enabled {
            return;
        }
        if let Err(err) = write_node(&self.unlock_path, &self.name) {
            tracing::warn!(name = %self.name, error = %err, "Wake lock release failed");
        }
    }
}

// sysfs attributes want one write without O_CREAT or truncation.
fn write_node(path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.write_all(value.as_bytes())
}
