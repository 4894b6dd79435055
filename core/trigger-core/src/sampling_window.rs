//! Fixed-duration accelerometer sampling window.
//!
//! IDLE → RUNNING on a motion fire, RUNNING → IDLE when the expiry timer for
//! that cycle comes back. A fire while RUNNING changes nothing: the window is
//! never restarted, extended, or cut short.

use std::time::Duration;

use crate::error::{Result, TriggerError};
use crate::platform::{Accelerometer, WindowTimer};
use crate::types::WindowState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStart {
    Started { cycle: u64 },
    AlreadyRunning { cycle: u64 },
}

/// Summary of a completed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEnd {
    pub cycle: u64,
    pub started_at_ms: i64,
    pub samples: u64,
}

pub struct SamplingWindow {
    accelerometer: Box<dyn Accelerometer>,
    timer: Box<dyn WindowTimer>,
    duration: Duration,
    rate_hz: u32,
    state: WindowState,
    cycle: u64,
    started_at_ms: i64,
    samples: u64,
    completed: u64,
}

impl SamplingWindow {
    pub fn new(
        accelerometer: Box<dyn Accelerometer>,
        timer: Box<dyn WindowTimer>,
        duration: Duration,
        rate_hz: u32,
    ) -> Self {
        SamplingWindow {
            accelerometer,
            timer,
            duration,
            rate_hz,
            state: WindowState::Idle,
            cycle: 0,
            started_at_ms: 0,
            samples: 0,
            completed: 0,
        }
    }

    pub fn start(&mut self, now_ms: i64) -> Result<WindowStart> {
        if self.state == WindowState::Running {
            return Ok(WindowStart::AlreadyRunning { cycle: self.cycle });
        }

        let cycle = self.cycle + 1;
        self.accelerometer
            .start(self.rate_hz)
            .map_err(|err| TriggerError::WindowStart {
                details: format!("accelerometer: {}", err),
            })?;

        if let Err(err) = self.timer.schedule(self.duration, cycle) {
            self.accelerometer.stop();
            return Err(TriggerError::WindowStart {
                details: format!("expiry timer: {}", err),
            });
        }

        self.cycle = cycle;
        self.state = WindowState::Running;
        self.started_at_ms = now_ms;
        self.samples = 0;
        tracing::info!(
            cycle,
            duration_ms = self.duration.as_millis() as u64,
            rate_hz = self.rate_hz,
            "Sampling window started"
        );
        Ok(WindowStart::Started { cycle })
    }

    /// Counts a reading against the running window; `false` while IDLE.
    pub fn accept_sample(&mut self) -> bool {
        if self.state != WindowState::Running {
            return false;
        }
        self.samples += 1;
        true
    }

    /// Ends the window if `cycle` is the one currently running.
    pub fn expire(&mut self, cycle: u64) -> Option<WindowEnd> {
        if self.state != WindowState::Running || cycle != self.cycle {
            tracing::debug!(cycle, current = self.cycle, "Ignoring stale window expiry");
            return None;
        }

        self.accelerometer.stop();
        self.state = WindowState::Idle;
        self.completed += 1;
        let end = WindowEnd {
            cycle,
            started_at_ms: self.started_at_ms,
            samples: self.samples,
        };
        tracing::info!(cycle, samples = end.samples, "Sampling window ended");
        Some(end)
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
