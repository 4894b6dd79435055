//! Recording collaborators and a discrete-time driver for controller tests.
//!
//! The driver plays the part of the host: it owns the clock, delivers
//! readings while the accelerometer runs, fires due timers and rearm ticks,
//! and feeds everything through `Controller::handle` one input at a time.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use trigger_core::platform::{
    Accelerometer, Display, Haptics, MotionTrigger, PeriodicScheduler, PlatformError, WakeLock,
    WindowTimer,
};
use trigger_core::{
    AccelReading, Collaborators, Controller, ControllerSettings, DisplayState, Input,
    SessionDirectory, TriggerError,
};

#[derive(Debug, Default)]
pub struct PlatformLog {
    pub trigger_requests: u32,
    pub trigger_cancels: u32,
    pub pending_triggers: u32,
    pub trigger_unavailable: bool,
    /// Requests that fail with `PlatformError::Failed` before one succeeds.
    pub trigger_failures_left: u32,

    pub accel_rate: Option<u32>,
    pub accel_starts: u32,
    pub accel_stops: u32,
    pub accel_start_fails: bool,

    pub scheduled_timers: Vec<(Duration, u64)>,
    pub timers_requested: u32,

    pub periodic: Option<(Duration, String)>,
    pub periodic_cancels: u32,
    pub periodic_refused: bool,

    pub haptic_pulses: Vec<Duration>,
    pub wake_acquired: u32,
    pub wake_released: u32,

    pub display_updates: u64,
    pub last_display: Option<DisplayState>,
}

pub type SharedLog = Arc<Mutex<PlatformLog>>;

struct FakeTrigger(SharedLog);
struct FakeAccelerometer(SharedLog);
struct FakeTimer(SharedLog);
struct FakeScheduler(SharedLog);
struct FakeHaptics(SharedLog);
struct FakeWakeLock(SharedLog);
struct FakeDisplay(SharedLog);

impl MotionTrigger for FakeTrigger {
    fn request(&mut self) -> Result<(), PlatformError> {
        let mut log = self.0.lock().unwrap();
        if log.trigger_unavailable {
            return Err(PlatformError::Unavailable("no significant motion sensor".into()));
        }
        if log.trigger_failures_left > 0 {
            log.trigger_failures_left -= 1;
            return Err(PlatformError::Failed("sensor busy".into()));
        }
        log.trigger_requests += 1;
        log.pending_triggers += 1;
        Ok(())
    }

    fn cancel(&mut self) {
        let mut log = self.0.lock().unwrap();
        log.trigger_cancels += 1;
        log.pending_triggers = 0;
    }
}

impl Accelerometer for FakeAccelerometer {
    fn start(&mut self, rate_hz: u32) -> Result<(), PlatformError> {
        let mut log = self.0.lock().unwrap();
        if log.accel_start_fails {
            return Err(PlatformError::Failed("sensor manager rejected listener".into()));
        }
        log.accel_rate = Some(rate_hz);
        log.accel_starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = self.0.lock().unwrap();
        log.accel_rate = None;
        log.accel_stops += 1;
    }
}

impl WindowTimer for FakeTimer {
    fn schedule(&mut self, delay: Duration, cycle: u64) -> Result<(), PlatformError> {
        let mut log = self.0.lock().unwrap();
        log.scheduled_timers.push((delay, cycle));
        log.timers_requested += 1;
        Ok(())
    }
}

impl PeriodicScheduler for FakeScheduler {
    fn register(&mut self, interval: Duration, payload: &str) -> Result<(), PlatformError> {
        let mut log = self.0.lock().unwrap();
        if log.periodic_refused {
            return Err(PlatformError::Failed("alarm service refused".into()));
        }
        log.periodic = Some((interval, payload.to_string()));
        Ok(())
    }

    fn cancel(&mut self) {
        let mut log = self.0.lock().unwrap();
        log.periodic = None;
        log.periodic_cancels += 1;
    }
}

impl Haptics for FakeHaptics {
    fn pulse(&mut self, duration: Duration) {
        self.0.lock().unwrap().haptic_pulses.push(duration);
    }
}

impl WakeLock for FakeWakeLock {
    fn acquire(&mut self) -> Result<(), PlatformError> {
        self.0.lock().unwrap().wake_acquired += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.0.lock().unwrap().wake_released += 1;
    }
}

impl Display for FakeDisplay {
    fn show(&mut self, state: &DisplayState) {
        let mut log = self.0.lock().unwrap();
        log.display_updates += 1;
        log.last_display = Some(state.clone());
    }
}

pub fn collaborators(log: &SharedLog) -> Collaborators {
    Collaborators {
        motion_trigger: Box::new(FakeTrigger(Arc::clone(log))),
        accelerometer: Box::new(FakeAccelerometer(Arc::clone(log))),
        window_timer: Box::new(FakeTimer(Arc::clone(log))),
        rearm_scheduler: Box::new(FakeScheduler(Arc::clone(log))),
        haptics: Box::new(FakeHaptics(Arc::clone(log))),
        wake_lock: Box::new(FakeWakeLock(Arc::clone(log))),
        display: Box::new(FakeDisplay(Arc::clone(log))),
    }
}

pub fn new_session(base: &std::path::Path) -> SessionDirectory {
    let started_at = Utc.with_ymd_and_hms(2026, 1, 31, 9, 5, 7).unwrap();
    SessionDirectory::create(base, started_at).expect("session directory")
}

pub fn try_start(log: &SharedLog) -> (TempDir, Result<Controller, TriggerError>) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let session = new_session(temp_dir.path());
    let result = Controller::start(session, collaborators(log), ControllerSettings::default(), 0);
    (temp_dir, result)
}

enum Due {
    Sample,
    Expiry(u64),
    Tick,
}

pub struct Driver {
    pub controller: Controller,
    pub log: SharedLog,
    pub now_ms: i64,
    next_sample_ms: Option<i64>,
    sample_period_ms: i64,
    timers: Vec<(i64, u64)>,
    next_tick_ms: Option<i64>,
    tick_interval_ms: i64,
    /// Pending trigger registrations observed after every handled input.
    pub pending_history: Vec<u32>,
    _temp_dir: TempDir,
}

impl Driver {
    pub fn new() -> Self {
        Self::with_settings(ControllerSettings::default())
    }

    pub fn with_settings(settings: ControllerSettings) -> Self {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let session = new_session(temp_dir.path());
        let log: SharedLog = Arc::new(Mutex::new(PlatformLog::default()));
        let sample_period_ms = 1000 / i64::from(settings.sample_rate_hz);
        let tick_interval_ms = settings.rearm_interval.as_millis() as i64;
        let controller =
            Controller::start(session, collaborators(&log), settings, 0).expect("controller start");

        let mut driver = Driver {
            controller,
            log,
            now_ms: 0,
            next_sample_ms: None,
            sample_period_ms,
            timers: Vec::new(),
            next_tick_ms: None,
            tick_interval_ms,
            pending_history: Vec::new(),
            _temp_dir: temp_dir,
        };
        driver.sync();
        driver
    }

    /// Delivers a hardware fire if a registration is pending, like the
    /// single-shot sensor would.
    pub fn fire_motion(&mut self) -> bool {
        {
            let mut log = self.log.lock().unwrap();
            if log.pending_triggers == 0 {
                return false;
            }
            log.pending_triggers = 0;
        }
        self.deliver(Input::MotionFired);
        true
    }

    /// Like [`Driver::fire_motion`], for fires whose handling is expected to fail.
    pub fn fire_motion_err(&mut self) -> TriggerError {
        {
            let mut log = self.log.lock().unwrap();
            assert!(log.pending_triggers > 0, "no registration pending");
            log.pending_triggers = 0;
        }
        self.try_deliver(Input::MotionFired)
            .expect_err("motion fire should have failed")
    }

    pub fn deliver(&mut self, input: Input) {
        if let Err(err) = self.try_deliver(input) {
            panic!("controller.handle failed at t={}: {}", self.now_ms, err);
        }
    }

    pub fn try_deliver(&mut self, input: Input) -> Result<(), TriggerError> {
        let result = self.controller.handle(input, self.now_ms);
        self.sync();
        let pending = self.log.lock().unwrap().pending_triggers;
        self.pending_history.push(pending);
        result
    }

    pub fn advance_to(&mut self, target_ms: i64) {
        while let Some((due_ms, due)) = self.next_due() {
            if due_ms > target_ms {
                break;
            }
            self.now_ms = due_ms;
            match due {
                Due::Sample => {
                    self.next_sample_ms = Some(due_ms + self.sample_period_ms);
                    let reading = AccelReading {
                        sensor_timestamp_ns: due_ms * 1_000_000,
                        x: 0.1,
                        y: 0.2,
                        z: 9.8,
                    };
                    self.deliver(Input::Reading(reading));
                }
                Due::Expiry(cycle) => {
                    self.timers.retain(|(_, c)| *c != cycle);
                    self.deliver(Input::WindowExpired { cycle });
                }
                Due::Tick => {
                    self.next_tick_ms = Some(due_ms + self.tick_interval_ms);
                    self.deliver(Input::RearmTick);
                }
            }
        }
        self.now_ms = target_ms;
    }

    fn next_due(&self) -> Option<(i64, Due)> {
        let mut best: Option<(i64, Due)> = None;
        if let Some(t) = self.next_sample_ms {
            best = Some((t, Due::Sample));
        }
        for (t, cycle) in &self.timers {
            if best.as_ref().map(|(b, _)| t < b).unwrap_or(true) {
                best = Some((*t, Due::Expiry(*cycle)));
            }
        }
        if let Some(t) = self.next_tick_ms {
            if best.as_ref().map(|(b, _)| t < *b).unwrap_or(true) {
                best = Some((t, Due::Tick));
            }
        }
        best
    }

    fn sync(&mut self) {
        let mut log = self.log.lock().unwrap();
        if log.accel_rate.is_some() {
            if self.next_sample_ms.is_none() {
                self.next_sample_ms = Some(self.now_ms + self.sample_period_ms);
            }
        } else {
            self.next_sample_ms = None;
        }

        for (delay, cycle) in log.scheduled_timers.drain(..) {
            self.timers.push((self.now_ms + delay.as_millis() as i64, cycle));
        }

        if log.periodic.is_some() {
            if self.next_tick_ms.is_none() {
                self.next_tick_ms = Some(self.now_ms + self.tick_interval_ms);
            }
        } else {
            self.next_tick_ms = None;
        }
    }

    pub fn event_lines(&self) -> Vec<String> {
        read_lines(&self.controller.session().event_log_path())
    }

    pub fn sample_lines(&self) -> Vec<String> {
        read_lines(&self.controller.session().sample_path())
    }

    pub fn labels(&self) -> Vec<String> {
        self.event_lines()
            .iter()
            .skip(1)
            .map(|line| line.split_once(',').expect("event line").1.to_string())
            .collect()
    }
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("read file")
        .lines()
        .map(str::to_string)
        .collect()
}
