//! Periodic liveness rearm.
//!
//! Detection cannot depend on this process staying alive, so the periodic
//! tick lives in a durable scheduler owned by the host. Each tick re-issues
//! `MotionWatch::arm()` regardless of the watch's current state.

use std::time::Duration;

use crate::error::{Result, TriggerError};
use crate::platform::PeriodicScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Stopped,
    Running,
    Cancelled,
}

pub struct RearmScheduler {
    scheduler: Box<dyn PeriodicScheduler>,
    interval: Duration,
    state: SchedulerState,
    ticks: u64,
}

impl RearmScheduler {
    pub fn new(scheduler: Box<dyn PeriodicScheduler>, interval: Duration) -> Self {
        RearmScheduler {
            scheduler,
            interval,
            state: SchedulerState::Stopped,
            ticks: 0,
        }
    }

    /// Installs the periodic callback. A failed registration is fatal.
    pub fn start(&mut self, payload: &str) -> Result<()> {
        match self.state {
            SchedulerState::Running => return Ok(()),
            SchedulerState::Cancelled => {
                return Err(TriggerError::Scheduling {
                    details: "rearm scheduler already cancelled".to_string(),
                })
            }
            SchedulerState::Stopped => {}
        }

        self.scheduler
            .register(self.interval, payload)
            .map_err(|err| TriggerError::Scheduling {
                details: err.to_string(),
            })?;
        self.state = SchedulerState::Running;
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            payload,
            "Rearm scheduler registered"
        );
        Ok(())
    }

    /// Accounts for a delivered tick. Returns whether the watch should be
    /// re-armed; ticks that were already queued when `cancel` ran return false.
    pub fn on_tick(&mut self) -> bool {
        if self.state != SchedulerState::Running {
            return false;
        }
        self.ticks += 1;
        true
    }

    /// Removes the periodic callback. Safe to call repeatedly or before `start`.
    pub fn cancel(&mut self) {
        if self.state == SchedulerState::Cancelled {
            return;
        }
        if self.state == SchedulerState::Running {
            self.scheduler.cancel();
        }
        self.state = SchedulerState::Cancelled;
        tracing::info!(ticks = self.ticks, "Rearm scheduler cancelled");
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformError;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        registered: Vec<(Duration, String)>,
        cancels: u32,
        refuse: bool,
    }

    struct FakeScheduler(Arc<Mutex<Calls>>);

    impl PeriodicScheduler for FakeScheduler {
        fn register(&mut self, interval: Duration, payload: &str) -> std::result::Result<(), PlatformError> {
            let mut calls = self.0.lock().unwrap();
            if calls.refuse {
                return Err(PlatformError::Failed("alarm refused".to_string()));
            }
            calls.registered.push((interval, payload.to_string()));
            Ok(())
        }
        fn cancel(&mut self) {
            self.0.lock().unwrap().cancels += 1;
        }
    }

    fn scheduler(refuse: bool) -> (RearmScheduler, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls {
            refuse,
            ..Calls::default()
        }));
        let scheduler = RearmScheduler::new(
            Box::new(FakeScheduler(Arc::clone(&calls))),
            Duration::from_secs(300),
        );
        (scheduler, calls)
    }

    #[test]
    fn registration_failure_is_fatal() {
        let (mut rearm, _calls) = scheduler(true);
        let err = rearm.start("2026-01-31_09_05_07").expect_err("refused");
        assert!(err.is_fatal());
        assert!(!rearm.is_running());
    }

    #[test]
    fn ticks_after_cancel_do_not_rearm() {
        let (mut rearm, calls) = scheduler(false);
        rearm.start("session").expect("start");
        assert!(rearm.on_tick());

        rearm.cancel();
        rearm.cancel();
        for _ in 0..10 {
            assert!(!rearm.on_tick());
        }

        assert_eq!(rearm.ticks(), 1);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.cancels, 1);
        assert_eq!(
            calls.registered,
            vec![(Duration::from_secs(300), "session".to_string())]
        );
    }

    #[test]
    fn cancel_before_start_is_safe() {
        let (mut rearm, calls) = scheduler(false);
        rearm.cancel();
        assert!(!rearm.on_tick());
        assert_eq!(calls.lock().unwrap().cancels, 0);
    }
}
