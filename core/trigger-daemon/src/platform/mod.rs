//! Linux host collaborators for the trigger controller.
//!
//! Every implementation reports back through an [`EventSink`]; none of them
//! hold a reference to the controller.

#[cfg(target_os = "linux")]
pub mod alarm;
pub mod feedback;
pub mod iio;
pub mod motion;
pub mod simulated;
pub mod status;
pub mod timers;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use trigger_core::platform::{Accelerometer, MotionTrigger, PeriodicScheduler};
use trigger_core::{Collaborators, PlatformError, TriggerError};

use crate::config::DaemonConfig;
use crate::dispatch::EventSink;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Background thread with a stop flag. Dropping it stops and joins.
pub struct Worker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn<F>(name: &str, body: F) -> Result<Self, PlatformError>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(thread_stop))
            .map_err(|err| PlatformError::Failed(format!("spawn {}: {}", name, err)))?;
        Ok(Worker {
            stop,
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Sleeps until `deadline` in short slices. Returns `false` if stopped first.
pub fn sleep_until(deadline: Instant, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

/// Monotonic sensor clock shared by every reading source in one run.
#[derive(Debug, Clone, Copy)]
pub struct SensorClock {
    origin: Instant,
}

impl SensorClock {
    pub fn new() -> Self {
        SensorClock {
            origin: Instant::now(),
        }
    }

    pub fn now_ns(&self) -> i64 {
        self.origin.elapsed().as_nanos() as i64
    }
}

impl Default for SensorClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the full collaborator set, real hardware or simulated.
pub fn build_collaborators(
    config: &DaemonConfig,
    sink: &EventSink,
    simulate: bool,
    status_path: &Path,
    session_name: &str,
) -> Result<Collaborators, TriggerError> {
    let clock = SensorClock::new();

    let motion_trigger: Box<dyn MotionTrigger>;
    let accelerometer: Box<dyn Accelerometer>;
    if simulate {
        motion_trigger = Box::new(simulated::SimulatedMotionTrigger::new(
            sink.clone(),
            Duration::from_millis(config.simulation.motion_delay_ms),
        ));
        accelerometer = Box::new(simulated::SimulatedAccelerometer::new(
            sink.clone(),
            clock,
            config.simulation.noise_mps2,
        ));
    } else {
        let device = Arc::new(open_accelerometer(&config.accelerometer.device)?);
        motion_trigger = Box::new(motion::IioMotionTrigger::new(
            Arc::clone(&device),
            sink.clone(),
            motion::DetectorSettings::from_config(&config.motion),
        ));
        accelerometer = Box::new(iio::IioAccelerometer::new(device, sink.clone(), clock));
    }

    Ok(Collaborators {
        motion_trigger,
        accelerometer,
        window_timer: Box::new(timers::ThreadWindowTimer::new(sink.clone())),
        rearm_scheduler: rearm_scheduler(sink, simulate),
        haptics: Box::new(feedback::VibratorHaptics::new(config.haptics.device.clone())),
        wake_lock: Box::new(feedback::SysfsWakeLock::new(
            config.wake_lock.enabled,
            &config.wake_lock.name,
        )),
        display: Box::new(status::StatusFileDisplay::new(status_path, session_name)),
    })
}

/// Simulation keeps the plain thread timer; real runs use the wake alarm.
fn rearm_scheduler(sink: &EventSink, simulate: bool) -> Box<dyn PeriodicScheduler> {
    if simulate {
        return Box::new(timers::ThreadPeriodicScheduler::new(sink.clone()));
    }
    #[cfg(target_os = "linux")]
    let scheduler: Box<dyn PeriodicScheduler> =
        Box::new(alarm::AlarmPeriodicScheduler::new(sink.clone()));
    #[cfg(not(target_os = "linux"))]
    let scheduler: Box<dyn PeriodicScheduler> =
        Box::new(timers::ThreadPeriodicScheduler::new(sink.clone()));
    scheduler
}

/// What `check` found. Fails with the same error `run` would hit at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub accelerometer: String,
    pub first_reading: Option<[f32; 3]>,
}

pub fn probe(config: &DaemonConfig, simulate: bool) -> Result<ProbeReport, TriggerError> {
    if simulate {
        return Ok(ProbeReport {
            accelerometer: "simulated".to_string(),
            first_reading: None,
        });
    }

    let device = open_accelerometer(&config.accelerometer.device)?;
    let first_reading = device.read().ok();
    Ok(ProbeReport {
        accelerometer: device.root().display().to_string(),
        first_reading,
    })
}

fn open_accelerometer(path: &Path) -> Result<iio::IioDevice, TriggerError> {
    iio::IioDevice::open(path).map_err(|err| TriggerError::MissingHardware {
        capability: "accelerometer",
        details: err.to_string(),
    })
}
