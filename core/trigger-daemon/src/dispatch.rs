//! Single dispatch thread.
//!
//! Sensor, timer and signal callbacks arrive on their own threads. They only
//! ever push an [`Envelope`] onto one channel; this loop is the sole caller of
//! `Controller::handle`, so the controller and both session files see exactly
//! one writer and inputs are applied in arrival order.

use chrono::Utc;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, error, info, warn};

use trigger_core::{Controller, Input, TriggerError};

// Disk-full at 100 Hz would otherwise flood the log.
const IO_WARN_EVERY: u64 = 500;

pub struct Envelope {
    pub input: Input,
    /// Wall-clock stamp taken when the callback fired, not when dispatched.
    pub received_at_ms: i64,
}

#[derive(Clone)]
pub struct EventSink {
    tx: Sender<Envelope>,
}

impl EventSink {
    /// Returns `false` once the dispatch loop has gone away.
    pub fn send(&self, input: Input) -> bool {
        self.send_at(input, now_ms())
    }

    /// For producers that learn of an event after the fact.
    pub fn send_at(&self, input: Input, received_at_ms: i64) -> bool {
        self.tx
            .send(Envelope {
                input,
                received_at_ms,
            })
            .is_ok()
    }
}

pub fn channel() -> (EventSink, Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel();
    (EventSink { tx }, rx)
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunLimits {
    /// Tear down after this many completed windows.
    pub max_windows: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub inputs: u64,
    pub io_errors: u64,
    pub other_errors: u64,
    /// The error that ended the run, if one did.
    pub fatal: Option<String>,
}

pub fn run(controller: &mut Controller, rx: Receiver<Envelope>, limits: RunLimits) -> RunSummary {
    let mut summary = RunSummary::default();

    while let Ok(envelope) = rx.recv() {
        summary.inputs += 1;
        match controller.handle(envelope.input, envelope.received_at_ms) {
            Ok(()) => {}
            Err(err @ TriggerError::Io { .. }) => {
                summary.io_errors += 1;
                if summary.io_errors % IO_WARN_EVERY == 1 {
                    warn!(error = %err, failures = summary.io_errors, "Session file append failed");
                }
            }
            Err(err) if err.is_fatal() => {
                error!(error = %err, "Fatal controller error; tearing down");
                controller.teardown(now_ms());
                summary.fatal = Some(err.to_string());
                break;
            }
            Err(err) => {
                summary.other_errors += 1;
                warn!(error = %err, "Controller input failed");
            }
        }

        if controller.is_torn_down() {
            debug!("Controller torn down; leaving dispatch loop");
            break;
        }

        if let Some(max) = limits.max_windows {
            if controller.windows_completed() >= max {
                info!(windows = max, "Window limit reached");
                controller.teardown(now_ms());
                break;
            }
        }
    }

    if !controller.is_torn_down() {
        warn!("Event channel closed before teardown");
        controller.teardown(now_ms());
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use trigger_core::platform::{
        Accelerometer, Display, Haptics, MotionTrigger, PeriodicScheduler, PlatformError,
        WakeLock, WindowTimer,
    };
    use trigger_core::{Collaborators, ControllerSettings, DisplayState, SessionDirectory};

    struct Trigger {
        requests: u32,
        fail_after: Option<u32>,
    }

    impl MotionTrigger for Trigger {
        fn request(&mut self) -> Result<(), PlatformError> {
            self.requests += 1;
            match self.fail_after {
                Some(limit) if self.requests > limit => {
                    Err(PlatformError::Unavailable("sensor gone".to_string()))
                }
                _ => Ok(()),
            }
        }
        fn cancel(&mut self) {}
    }

    struct Quiet;

    impl Accelerometer for Quiet {
        fn start(&mut self, _rate_hz: u32) -> Result<(), PlatformError> {
            Ok(())
        }
        fn stop(&mut self) {}
    }

    impl WindowTimer for Quiet {
        fn schedule(&mut self, _delay: Duration, _cycle: u64) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    impl PeriodicScheduler for Quiet {
        fn register(&mut self, _interval: Duration, _payload: &str) -> Result<(), PlatformError> {
            Ok(())
        }
        fn cancel(&mut self) {}
    }

    impl Haptics for Quiet {
        fn pulse(&mut self, _duration: Duration) {}
    }

    impl WakeLock for Quiet {
        fn acquire(&mut self) -> Result<(), PlatformError> {
            Ok(())
        }
        fn release(&mut self) {}
    }

    impl Display for Quiet {
        fn show(&mut self, _state: &DisplayState) {}
    }

    fn controller(base: &std::path::Path, fail_after: Option<u32>) -> Controller {
        let session = SessionDirectory::create(base, Utc::now()).expect("session");
        let collaborators = Collaborators {
            motion_trigger: Box::new(Trigger {
                requests: 0,
                fail_after,
            }),
            accelerometer: Box::new(Quiet),
            window_timer: Box::new(Quiet),
            rearm_scheduler: Box::new(Quiet),
            haptics: Box::new(Quiet),
            wake_lock: Box::new(Quiet),
            display: Box::new(Quiet),
        };
        Controller::start(session, collaborators, ControllerSettings::default(), now_ms())
            .expect("start")
    }

    #[test]
    fn stops_after_window_limit() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut controller = controller(temp_dir.path(), None);
        let (sink, rx) = channel();

        sink.send(Input::MotionFired);
        sink.send(Input::WindowExpired { cycle: 1 });
        sink.send(Input::RearmTick);

        let summary = run(&mut controller, rx, RunLimits { max_windows: Some(1) });

        assert_eq!(summary.inputs, 2);
        assert_eq!(summary.fatal, None);
        assert!(controller.is_torn_down());
        assert_eq!(controller.windows_completed(), 1);
    }

    #[test]
    fn teardown_input_ends_loop() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut controller = controller(temp_dir.path(), None);
        let (sink, rx) = channel();

        sink.send(Input::Teardown);
        sink.send(Input::MotionFired);

        let summary = run(&mut controller, rx, RunLimits::default());

        assert_eq!(summary.inputs, 1);
        assert!(controller.is_torn_down());
    }

    #[test]
    fn lost_sensor_is_fatal() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut controller = controller(temp_dir.path(), Some(1));
        let (sink, rx) = channel();

        sink.send(Input::MotionFired);
        sink.send(Input::WindowExpired { cycle: 1 });

        let summary = run(&mut controller, rx, RunLimits::default());

        assert_eq!(summary.inputs, 1);
        assert!(summary.fatal.is_some());
        assert!(controller.is_torn_down());
    }

    #[test]
    fn closed_channel_still_tears_down() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut controller = controller(temp_dir.path(), None);
        let (sink, rx) = channel();
        drop(sink);

        let summary = run(&mut controller, rx, RunLimits::default());

        assert_eq!(summary.inputs, 0);
        assert!(controller.is_torn_down());
    }
}
