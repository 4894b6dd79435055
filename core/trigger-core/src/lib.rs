//! # trigger-core
//!
//! Lifecycle controller for a significant-motion logger: a single-shot motion
//! watch starts a fixed-length accelerometer sampling window, every event and
//! sample is appended to the session directory, and a periodic liveness tick
//! keeps exactly one motion request pending.
//!
//! ## Design Principles
//!
//! - **Host-agnostic**: hardware, timers, haptics, the wake lock and the display
//!   are capability traits in [`platform`]. The crate never spawns threads.
//! - **Serialized**: [`Controller`] takes `&mut self` for every transition. The
//!   host owns the single dispatch queue that feeds it.
//! - **Best-effort logging**: file append failures are reported as
//!   [`TriggerError::Io`] and never stop the state machine.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trigger_core::{Controller, ControllerSettings, Input, SessionDirectory};
//!
//! let session = SessionDirectory::create(&base, chrono::Local::now())?;
//! let mut controller = Controller::start(session, collaborators, ControllerSettings::default(), now_ms)?;
//! controller.handle(Input::MotionFired, now_ms)?;
//! ```

pub mod controller;
pub mod error;
pub mod event_log;
pub mod motion_watch;
pub mod platform;
pub mod rearm;
pub mod sample_recorder;
pub mod sampling_window;
pub mod session;
pub mod types;

pub use controller::{Collaborators, Controller, ControllerSettings, Input, LifecycleEvent};
pub use error::{Result, TriggerError};
pub use event_log::EventLog;
pub use motion_watch::MotionWatch;
pub use platform::PlatformError;
pub use rearm::RearmScheduler;
pub use sample_recorder::SampleRecorder;
pub use sampling_window::SamplingWindow;
pub use session::SessionDirectory;
pub use types::*;
