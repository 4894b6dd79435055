//! Capability interfaces for everything outside the state machine.
//!
//! The host implements these over real hardware, OS timers, or fakes. Every
//! callback they produce (a motion fire, a reading, a timer expiry, a rearm
//! tick) must come back through the host's dispatch queue as a
//! [`crate::Input`]; implementations never call into the controller directly.

use std::time::Duration;

use crate::types::DisplayState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The capability does not exist on this device.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("failed: {0}")]
    Failed(String),
}

/// Single-shot significant-motion detector.
///
/// `request` registers one pending detection; after it fires the host must
/// request again. `cancel` is idempotent.
pub trait MotionTrigger: Send {
    fn request(&mut self) -> Result<(), PlatformError>;
    fn cancel(&mut self);
}

/// Continuous accelerometer stream at a fixed rate.
pub trait Accelerometer: Send {
    fn start(&mut self, rate_hz: u32) -> Result<(), PlatformError>;
    fn stop(&mut self);
}

/// One-shot timer that delivers `Input::WindowExpired { cycle }` after `delay`.
pub trait WindowTimer: Send {
    fn schedule(&mut self, delay: Duration, cycle: u64) -> Result<(), PlatformError>;
}

/// Durable, wake-capable periodic trigger delivering `Input::RearmTick`.
///
/// Durability across process suspension is the implementation's job; the
/// controller only relies on `register` and `cancel`.
pub trait PeriodicScheduler: Send {
    fn register(&mut self, interval: Duration, payload: &str) -> Result<(), PlatformError>;
    fn cancel(&mut self);
}

/// Fire-and-forget haptic pulse.
pub trait Haptics: Send {
    fn pulse(&mut self, duration: Duration);
}

pub trait WakeLock: Send {
    fn acquire(&mut self) -> Result<(), PlatformError>;
    fn release(&mut self);
}

/// Display surface for magnitude, sample count and status.
pub trait Display: Send {
    fn show(&mut self, state: &DisplayState);
}
