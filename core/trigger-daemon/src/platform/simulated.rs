//! Hardware-free collaborators for `--simulate` and smoke tests.

use std::time::{Duration, Instant};

use trigger_core::platform::{Accelerometer, MotionTrigger, PlatformError};
use trigger_core::{AccelReading, Input};

use super::motion::STANDARD_GRAVITY;
use super::{sleep_until, SensorClock, Worker};
use crate::dispatch::EventSink;

/// Fires once, `delay` after each request.
pub struct SimulatedMotionTrigger {
    sink: EventSink,
    delay: Duration,
    worker: Option<Worker>,
}

impl SimulatedMotionTrigger {
    pub fn new(sink: EventSink, delay: Duration) -> Self {
        SimulatedMotionTrigger {
            sink,
            delay,
            worker: None,
        }
    }
}

impl MotionTrigger for SimulatedMotionTrigger {
    fn request(&mut self) -> Result<(), PlatformError> {
        if self.worker.as_ref().is_some_and(|worker| !worker.is_finished()) {
            return Ok(());
        }

        let sink = self.sink.clone();
        let deadline = Instant::now() + self.delay;
        self.worker = Some(Worker::spawn("simulated-motion", move |stop| {
            if sleep_until(deadline, &stop) {
                sink.send(Input::MotionFired);
            }
        })?);
        Ok(())
    }

    fn cancel(&mut self) {
        self.worker = None;
    }
}

/// Device lying flat: gravity on z plus a small deterministic wobble.
pub struct SimulatedAccelerometer {
    sink: EventSink,
    clock: SensorClock,
    noise: f32,
    worker: Option<Worker>,
}

impl SimulatedAccelerometer {
    pub fn new(sink: EventSink, clock: SensorClock, noise: f32) -> Self {
        SimulatedAccelerometer {
            sink,
            clock,
            noise,
            worker: None,
        }
    }
}

fn wobble(step: u64, noise: f32) -> [f32; 3] {
    let t = step as f32 * 0.1;
    [
        noise * t.sin(),
        noise * (t * 0.7).cos(),
        STANDARD_GRAVITY + noise * (t * 1.3).sin(),
    ]
}

impl Accelerometer for SimulatedAccelerometer {
    fn start(&mut self, rate_hz: u32) -> Result<(), PlatformError> {
        if rate_hz == 0 {
            return Err(PlatformError::Failed("sample rate must be positive".to_string()));
        }
        if self.worker.is_some() {
            return Ok(());
        }

        let sink = self.sink.clone();
        let clock = self.clock;
        let noise = self.noise;
        let period = Duration::from_secs(1) / rate_hz;
        self.worker = Some(Worker::spawn("simulated-sampler", move |stop| {
            let mut step = 0u64;
            let mut next = Instant::now() + period;
            while sleep_until(next, &stop) {
                let [x, y, z] = wobble(step, noise);
                let reading = AccelReading {
                    sensor_timestamp_ns: clock.now_ns(),
                    x,
                    y,
                    z,
                };
                if !sink.send(Input::Reading(reading)) {
                    break;
                }
                step += 1;
                next += period;
            }
        })?);
        Ok(())
    }

    fn stop(&mut self) {
        self.worker = None;
    }
}
