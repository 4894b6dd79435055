//! Daemon runtime configuration (`~/.trigger-sensor/daemon.toml`).
//!
//! A missing file means defaults. Every field has a serde default, so a file
//! only needs the values it changes:
//!
//! ```toml
//! [window]
//! duration_ms = 60000
//! sample_rate_hz = 100
//!
//! [rearm]
//! interval_ms = 300000
//!
//! [accelerometer]
//! device = "/sys/bus/iio/devices/iio:device0"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use trigger_core::{ControllerSettings, TriggerError};

pub const APP_DIR: &str = ".trigger-sensor";
const CONFIG_FILE: &str = "daemon.toml";
const SESSIONS_DIR: &str = "sessions";
const STATUS_FILE: &str = "status.json";

const DEFAULT_WINDOW_DURATION_MS: u64 = 60_000;
const DEFAULT_SAMPLE_RATE_HZ: u32 = 100;
const DEFAULT_REARM_INTERVAL_MS: u64 = 300_000;
const DEFAULT_HAPTIC_PULSE_MS: u64 = 500;
const DEFAULT_WAKE_LOCK_NAME: &str = "trigger-sensor";
const DEFAULT_IIO_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";
const DEFAULT_MOTION_THRESHOLD_MPS2: f32 = 1.5;
const DEFAULT_MOTION_SUSTAIN_MS: u64 = 2_000;
const DEFAULT_MOTION_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_SIMULATED_MOTION_DELAY_MS: u64 = 5_000;
const DEFAULT_SIMULATED_NOISE_MPS2: f32 = 0.3;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WindowConfig {
    #[serde(default = "default_window_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_WINDOW_DURATION_MS,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RearmConfig {
    #[serde(default = "default_rearm_interval_ms")]
    pub interval_ms: u64,
}

impl Default for RearmConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_REARM_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HapticsConfig {
    #[serde(default = "default_haptic_pulse_ms")]
    pub pulse_ms: u64,
    /// `timed_output` vibrator node, e.g. `/sys/class/timed_output/vibrator/enable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<PathBuf>,
}

impl Default for HapticsConfig {
    fn default() -> Self {
        Self {
            pulse_ms: DEFAULT_HAPTIC_PULSE_MS,
            device: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WakeLockConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_wake_lock_name")]
    pub name: String,
}

impl Default for WakeLockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: DEFAULT_WAKE_LOCK_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AccelerometerConfig {
    #[serde(default = "default_iio_device")]
    pub device: PathBuf,
}

impl Default for AccelerometerConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_IIO_DEVICE),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MotionConfig {
    /// Smoothed deviation of |a| from gravity that counts as motion.
    #[serde(default = "default_motion_threshold")]
    pub threshold_mps2: f32,
    #[serde(default = "default_motion_sustain_ms")]
    pub sustain_ms: u64,
    #[serde(default = "default_motion_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            threshold_mps2: DEFAULT_MOTION_THRESHOLD_MPS2,
            sustain_ms: DEFAULT_MOTION_SUSTAIN_MS,
            poll_interval_ms: DEFAULT_MOTION_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SimulationConfig {
    /// Delay between a trigger request and the simulated fire.
    #[serde(default = "default_simulated_motion_delay_ms")]
    pub motion_delay_ms: u64,
    #[serde(default = "default_simulated_noise")]
    pub noise_mps2: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            motion_delay_ms: DEFAULT_SIMULATED_MOTION_DELAY_MS,
            noise_mps2: DEFAULT_SIMULATED_NOISE_MPS2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct DaemonConfig {
    /// Parent of the session directories. Defaults to `~/.trigger-sensor/sessions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub rearm: RearmConfig,
    #[serde(default)]
    pub haptics: HapticsConfig,
    #[serde(default)]
    pub wake_lock: WakeLockConfig,
    #[serde(default)]
    pub accelerometer: AccelerometerConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl DaemonConfig {
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            window_duration: Duration::from_millis(self.window.duration_ms),
            sample_rate_hz: self.window.sample_rate_hz,
            rearm_interval: Duration::from_millis(self.rearm.interval_ms),
            haptic_pulse: Duration::from_millis(self.haptics.pulse_ms),
        }
    }

    /// Rejects values that would make the lifecycle degenerate.
    pub fn validate(&self, path: &Path) -> Result<(), TriggerError> {
        let problem = if self.window.duration_ms == 0 {
            Some("window.duration_ms must be greater than zero")
        } else if self.window.sample_rate_hz == 0 {
            Some("window.sample_rate_hz must be greater than zero")
        } else if self.window.sample_rate_hz > 1_000 {
            Some("window.sample_rate_hz must be at most 1000")
        } else if self.rearm.interval_ms == 0 {
            Some("rearm.interval_ms must be greater than zero")
        } else if self.motion.poll_interval_ms == 0 {
            Some("motion.poll_interval_ms must be greater than zero")
        } else if self.motion.threshold_mps2.is_nan() || self.motion.threshold_mps2 <= 0.0 {
            Some("motion.threshold_mps2 must be positive")
        } else {
            None
        };

        match problem {
            Some(details) => Err(TriggerError::ConfigMalformed {
                path: path.to_path_buf(),
                details: details.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn sessions_dir(&self) -> Result<PathBuf, String> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(app_dir()?.join(SESSIONS_DIR)),
        }
    }
}

pub fn app_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(APP_DIR))
}

pub fn default_config_path() -> Result<PathBuf, String> {
    Ok(app_dir()?.join(CONFIG_FILE))
}

pub fn status_path() -> Result<PathBuf, String> {
    Ok(app_dir()?.join(STATUS_FILE))
}

pub fn load_config(path: Option<PathBuf>) -> Result<DaemonConfig, TriggerError> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path().map_err(|details| TriggerError::ConfigMalformed {
            path: PathBuf::from(CONFIG_FILE),
            details,
        })?,
    };

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No daemon config; using defaults");
        return Ok(DaemonConfig::default());
    }

    let content = fs_err::read_to_string(&config_path).map_err(|err| {
        TriggerError::ConfigMalformed {
            path: config_path.clone(),
            details: err.to_string(),
        }
    })?;
    let config = toml::from_str::<DaemonConfig>(&content).map_err(|err| {
        TriggerError::ConfigMalformed {
            path: config_path.clone(),
            details: err.to_string(),
        }
    })?;
    config.validate(&config_path)?;
    Ok(config)
}

fn default_true() -> bool {
    true
}

fn default_window_duration_ms() -> u64 {
    DEFAULT_WINDOW_DURATION_MS
}

fn default_sample_rate_hz() -> u32 {
    DEFAULT_SAMPLE_RATE_HZ
}

fn default_rearm_interval_ms() -> u64 {
    DEFAULT_REARM_INTERVAL_MS
}

fn default_haptic_pulse_ms() -> u64 {
    DEFAULT_HAPTIC_PULSE_MS
}

fn default_wake_lock_name() -> String {
    DEFAULT_WAKE_LOCK_NAME.to_string()
}

fn default_iio_device() -> PathBuf {
    PathBuf::from(DEFAULT_IIO_DEVICE)
}

fn default_motion_threshold() -> f32 {
    DEFAULT_MOTION_THRESHOLD_MPS2
}

fn default_motion_sustain_ms() -> u64 {
    DEFAULT_MOTION_SUSTAIN_MS
}

fn default_motion_poll_interval_ms() -> u64 {
    DEFAULT_MOTION_POLL_INTERVAL_MS
}

fn default_simulated_motion_delay_ms() -> u64 {
    DEFAULT_SIMULATED_MOTION_DELAY_MS
}

fn default_simulated_noise() -> f32 {
    DEFAULT_SIMULATED_NOISE_MPS2
}
