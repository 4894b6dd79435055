//! Thread-backed timers.
//!
//! [`ThreadPeriodicScheduler`] sleeps on the monotonic clock and does not wake
//! a suspended host; real runs on Linux use `alarm::AlarmPeriodicScheduler`
//! instead. [`ResumeWatcher`] notices a system suspend and asks the controller
//! to re-arm on wake whichever scheduler is in use.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant, SystemTime};

use trigger_core::platform::{PeriodicScheduler, PlatformError, WindowTimer};
use trigger_core::{Input, LifecycleEvent};

use super::{sleep_until, Worker};
use crate::dispatch::EventSink;

const RESUME_POLL: Duration = Duration::from_secs(1);
/// Wall clock running ahead of the monotonic clock by more than this means
/// the machine was suspended.
const SUSPEND_GAP: Duration = Duration::from_secs(5);

pub struct ThreadWindowTimer {
    sink: EventSink,
    pending: Vec<Worker>,
}

impl ThreadWindowTimer {
    pub fn new(sink: EventSink) -> Self {
        ThreadWindowTimer {
            sink,
            pending: Vec::new(),
        }
    }
}

impl WindowTimer for ThreadWindowTimer {
    fn schedule(&mut self, delay: Duration, cycle: u64) -> Result<(), PlatformError> {
        self.pending.retain(|worker| !worker.is_finished());

        let sink = self.sink.clone();
        let deadline = Instant::now() + delay;
        self.pending.push(Worker::spawn("window-timer", move |stop| {
            if sleep_until(deadline, &stop) {
                sink.send(Input::WindowExpired { cycle });
            }
        })?);
        Ok(())
    }
}

pub struct ThreadPeriodicScheduler {
    sink: EventSink,
    worker: Option<Worker>,
}

impl ThreadPeriodicScheduler {
    pub fn new(sink: EventSink) -> Self {
        ThreadPeriodicScheduler { sink, worker: None }
    }
}

impl PeriodicScheduler for ThreadPeriodicScheduler {
    fn register(&mut self, interval: Duration, payload: &str) -> Result<(), PlatformError> {
        if interval.is_zero() {
            return Err(PlatformError::Failed("rearm interval must be positive".to_string()));
        }
        self.worker = None;

        let sink = self.sink.clone();
        let payload = payload.to_string();
        self.worker = Some(Worker::spawn("rearm-scheduler", move |stop| {
            let mut next = Instant::now() + interval;
            while sleep_until(next, &stop) {
                tracing::debug!(payload = %payload, "Rearm alarm");
                if !sink.send(Input::RearmTick) {
                    break;
                }
                next += interval;
            }
        })?);
        Ok(())
    }

    fn cancel(&mut self) {
        self.worker = None;
    }
}

/// Reports a host suspend as `Lifecycle(Paused)`, stamped with the last wall
/// time seen before the gap, followed by `Lifecycle(Resumed)`.
pub struct ResumeWatcher {
    _worker: Worker,
}

impl ResumeWatcher {
    pub fn spawn(sink: EventSink) -> Result<Self, PlatformError> {
        let worker = Worker::spawn("resume-watcher", move |stop| {
            let mut last_mono = Instant::now();
            let mut last_wall = SystemTime::now();
            while sleep_until(Instant::now() + RESUME_POLL, &stop) {
                let mono = Instant::now();
                let wall = SystemTime::now();
                let wall_elapsed = wall.duration_since(last_wall).unwrap_or_default();
                if let Some(gap) = suspend_gap(mono.duration_since(last_mono), wall_elapsed) {
                    tracing::info!(suspended_secs = gap.as_secs(), "System resume detected");
                    if !report_suspend(&sink, last_wall) {
                        break;
                    }
                }
                last_mono = mono;
                last_wall = wall;
            }
        })?;
        Ok(ResumeWatcher { _worker: worker })
    }
}

/// Wall time that passed without monotonic time passing with it.
fn suspend_gap(mono_elapsed: Duration, wall_elapsed: Duration) -> Option<Duration> {
    let gap = wall_elapsed.checked_sub(mono_elapsed)?;
    (gap > SUSPEND_GAP).then_some(gap)
}

fn report_suspend(sink: &EventSink, last_wall_before: SystemTime) -> bool {
    let paused_at_ms = DateTime::<Utc>::from(last_wall_before).timestamp_millis();
    sink.send_at(Input::Lifecycle(LifecycleEvent::Paused), paused_at_ms)
        && sink.send(Input::Lifecycle(LifecycleEvent::Resumed))
}
