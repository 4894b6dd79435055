//! Serialized trigger → sample → rearm controller.
//!
//! The host translates every platform callback into an [`Input`] and feeds
//! them one at a time to [`Controller::handle`]. Each input kind maps to one
//! named transition function below; nothing here is reentrant and nothing
//! here touches a thread.

use std::time::Duration;

use crate::error::Result;
use crate::event_log::EventLog;
use crate::motion_watch::MotionWatch;
use crate::platform::{
    Accelerometer, Display, Haptics, MotionTrigger, PeriodicScheduler, WakeLock, WindowTimer,
};
use crate::rearm::RearmScheduler;
use crate::sample_recorder::SampleRecorder;
use crate::sampling_window::{SamplingWindow, WindowStart};
use crate::session::SessionDirectory;
use crate::types::{AccelReading, DisplayState, Sample, WatchState, WindowState};

// Event labels written to Log.txt.
pub const LABEL_SESSION_START: &str = "session start";
pub const LABEL_TRIGGER_FIRED: &str = "trigger fired";
pub const LABEL_SAMPLING_START: &str = "sampling start";
pub const LABEL_SAMPLING_STOP: &str = "sampling stop";
pub const LABEL_WINDOW_END: &str = "window end";
pub const LABEL_REARM_TICK: &str = "rearm tick";
pub const LABEL_RESUME: &str = "resume";
pub const LABEL_PAUSE: &str = "pause";
pub const LABEL_TEARDOWN: &str = "teardown";

pub const STATUS_ARMED: &str = "armed";
pub const STATUS_SAMPLING: &str = "sampling";
pub const STATUS_WINDOW_END: &str = "window end";
pub const STATUS_STOPPED: &str = "stopped";

pub const DEFAULT_WINDOW_DURATION: Duration = Duration::from_secs(60);
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 100;
pub const DEFAULT_REARM_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_HAPTIC_PULSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Host came back to the foreground; re-requests the motion trigger.
    Resumed,
    Paused,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    MotionFired,
    Reading(AccelReading),
    WindowExpired { cycle: u64 },
    RearmTick,
    Lifecycle(LifecycleEvent),
    Teardown,
}

/// Fixed for the whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub window_duration: Duration,
    pub sample_rate_hz: u32,
    pub rearm_interval: Duration,
    pub haptic_pulse: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            window_duration: DEFAULT_WINDOW_DURATION,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            rearm_interval: DEFAULT_REARM_INTERVAL,
            haptic_pulse: DEFAULT_HAPTIC_PULSE,
        }
    }
}

pub struct Collaborators {
    pub motion_trigger: Box<dyn MotionTrigger>,
    pub accelerometer: Box<dyn Accelerometer>,
    pub window_timer: Box<dyn WindowTimer>,
    pub rearm_scheduler: Box<dyn PeriodicScheduler>,
    pub haptics: Box<dyn Haptics>,
    pub wake_lock: Box<dyn WakeLock>,
    pub display: Box<dyn Display>,
}

pub struct Controller {
    session: SessionDirectory,
    settings: ControllerSettings,
    event_log: EventLog,
    recorder: SampleRecorder,
    watch: MotionWatch,
    window: SamplingWindow,
    rearm: RearmScheduler,
    haptics: Box<dyn Haptics>,
    wake_lock: Box<dyn WakeLock>,
    display: Box<dyn Display>,
    display_state: DisplayState,
    wake_lock_held: bool,
    torn_down: bool,
}

impl Controller {
    /// Opens both session files, arms the watch, and registers the rearm
    /// scheduler. Missing hardware and a refused scheduler are fatal.
    pub fn start(
        session: SessionDirectory,
        collaborators: Collaborators,
        settings: ControllerSettings,
        now_ms: i64,
    ) -> Result<Self> {
        let Collaborators {
            motion_trigger,
            accelerometer,
            window_timer,
            rearm_scheduler,
            haptics,
            mut wake_lock,
            display,
        } = collaborators;

        let mut event_log = EventLog::create(&session.event_log_path())?;
        if let Err(err) = event_log.record(now_ms, LABEL_SESSION_START) {
            tracing::warn!(error = %err, "Failed to log session start");
        }

        let mut recorder = SampleRecorder::new(&session.sample_path());
        recorder.start()?;

        let mut watch = MotionWatch::start(motion_trigger)?;

        let mut rearm = RearmScheduler::new(rearm_scheduler, settings.rearm_interval);
        if let Err(err) = rearm.start(session.name()) {
            watch.cancel();
            return Err(err);
        }

        let wake_lock_held = match wake_lock.acquire() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to acquire wake lock; continuing without it");
                false
            }
        };

        let window = SamplingWindow::new(
            accelerometer,
            window_timer,
            settings.window_duration,
            settings.sample_rate_hz,
        );

        let mut controller = Controller {
            session,
            settings,
            event_log,
            recorder,
            watch,
            window,
            rearm,
            haptics,
            wake_lock,
            display,
            display_state: DisplayState {
                magnitude: 0.0,
                sample_count: 0,
                status: STATUS_ARMED.to_string(),
            },
            wake_lock_held,
            torn_down: false,
        };
        controller.refresh_display();

        tracing::info!(
            session = %controller.session.name(),
            window_ms = controller.settings.window_duration.as_millis() as u64,
            rate_hz = controller.settings.sample_rate_hz,
            rearm_ms = controller.settings.rearm_interval.as_millis() as u64,
            "Trigger controller started"
        );
        Ok(controller)
    }

    pub fn handle(&mut self, input: Input, now_ms: i64) -> Result<()> {
        if self.torn_down {
            tracing::debug!(input = ?input, "Ignoring input after teardown");
            return Ok(());
        }

        match input {
            Input::MotionFired => self.on_motion_fired(now_ms),
            Input::Reading(reading) => self.on_reading(reading, now_ms),
            Input::WindowExpired { cycle } => self.on_window_expired(cycle, now_ms),
            Input::RearmTick => self.on_rearm_tick(now_ms),
            Input::Lifecycle(event) => self.on_lifecycle(event, now_ms),
            Input::Teardown => {
                self.teardown(now_ms);
                Ok(())
            }
        }
    }

    /// Logs the fire, opens a window unless one is running, and re-arms
    /// immediately so overlapping motion is still detected.
    pub fn on_motion_fired(&mut self, now_ms: i64) -> Result<()> {
        if !self.watch.on_fired() {
            tracing::debug!(state = ?self.watch.state(), "Ignoring motion fire while not armed");
            return Ok(());
        }

        tracing::info!(now_ms, "Significant motion fired");
        self.record_event(now_ms, LABEL_TRIGGER_FIRED);

        let started = self.window.start(now_ms);
        let rearmed = self.watch.arm();
        if let Err(err) = &rearmed {
            tracing::warn!(error = %err, "Failed to re-arm motion watch after fire");
        }

        match started? {
            WindowStart::Started { .. } => {
                self.record_event(now_ms, LABEL_SAMPLING_START);
                self.display_state.status = STATUS_SAMPLING.to_string();
                self.refresh_display();
            }
            WindowStart::AlreadyRunning { cycle } => {
                tracing::debug!(cycle, "Motion fired during running window; window unchanged");
            }
        }

        rearmed
    }

    pub fn on_reading(&mut self, reading: AccelReading, now_ms: i64) -> Result<()> {
        if !self.window.accept_sample() {
            tracing::trace!("Dropping reading outside sampling window");
            return Ok(());
        }

        let result = self
            .recorder
            .record(&Sample::from_reading(&reading, now_ms))
            .map(|_| ());
        self.display_state.magnitude = reading.magnitude();
        self.display_state.sample_count = self.recorder.count();
        self.refresh_display();
        result
    }

    /// Closes the window for `cycle`, re-arms, and signals completion.
    pub fn on_window_expired(&mut self, cycle: u64, now_ms: i64) -> Result<()> {
        let end = match self.window.expire(cycle) {
            Some(end) => end,
            None => return Ok(()),
        };

        self.recorder.stop();
        self.record_event(now_ms, LABEL_SAMPLING_STOP);
        self.record_event(now_ms, LABEL_WINDOW_END);

        let rearmed = self.watch.arm();
        if let Err(err) = &rearmed {
            tracing::warn!(error = %err, "Failed to re-arm motion watch at window end");
        }

        self.haptics.pulse(self.settings.haptic_pulse);
        self.display_state.status = STATUS_WINDOW_END.to_string();
        self.refresh_display();

        tracing::info!(
            cycle = end.cycle,
            samples = end.samples,
            elapsed_ms = now_ms - end.started_at_ms,
            total_samples = self.recorder.count(),
            "Window complete"
        );
        rearmed
    }

    /// Unconditional re-arm; a no-op once the scheduler is cancelled.
    pub fn on_rearm_tick(&mut self, now_ms: i64) -> Result<()> {
        if !self.rearm.on_tick() {
            tracing::debug!("Ignoring rearm tick after cancel");
            return Ok(());
        }

        self.record_event(now_ms, LABEL_REARM_TICK);
        tracing::debug!(ticks = self.rearm.ticks(), "Rearm tick");
        self.watch.arm()
    }

    pub fn on_lifecycle(&mut self, event: LifecycleEvent, now_ms: i64) -> Result<()> {
        match event {
            LifecycleEvent::Resumed => {
                self.record_event(now_ms, LABEL_RESUME);
                self.watch.arm()
            }
            LifecycleEvent::Paused => {
                self.record_event(now_ms, LABEL_PAUSE);
                self.display_state.magnitude = 0.0;
                self.refresh_display();
                Ok(())
            }
        }
    }

    /// Cancels the scheduler and the watch and releases the wake lock. A
    /// running window is not interrupted; the host drops it with the process.
    pub fn teardown(&mut self, now_ms: i64) {
        if self.torn_down {
            return;
        }

        self.record_event(now_ms, LABEL_TEARDOWN);
        self.rearm.cancel();
        self.watch.cancel();
        if self.wake_lock_held {
            self.wake_lock.release();
            self.wake_lock_held = false;
        }
        self.torn_down = true;
        self.display_state.status = STATUS_STOPPED.to_string();
        self.refresh_display();

        tracing::info!(
            session = %self.session.name(),
            samples = self.recorder.count(),
            windows = self.window.completed(),
            "Trigger controller torn down"
        );
    }

    fn record_event(&mut self, now_ms: i64, label: &str) {
        if let Err(err) = self.event_log.record(now_ms, label) {
            tracing::warn!(error = %err, label, "Failed to append event log");
        }
    }

    fn refresh_display(&mut self) {
        self.display.show(&self.display_state);
    }

    pub fn session(&self) -> &SessionDirectory {
        &self.session
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn watch_state(&self) -> WatchState {
        self.watch.state()
    }

    pub fn window_state(&self) -> WindowState {
        self.window.state()
    }

    pub fn sample_count(&self) -> u64 {
        self.recorder.count()
    }

    pub fn windows_completed(&self) -> u64 {
        self.window.completed()
    }

    pub fn events_logged(&self) -> u64 {
        self.event_log.entries()
    }

    pub fn display_state(&self) -> &DisplayState {
        &self.display_state
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
