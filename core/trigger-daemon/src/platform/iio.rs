//! Linux IIO accelerometer over sysfs.
//!
//! ```text
//! /sys/bus/iio/devices/iio:device0/
//! ├── in_accel_x_raw
//! ├── in_accel_y_raw
//! ├── in_accel_z_raw
//! └── in_accel_scale      # or in_accel_{x,y,z}_scale
//! ```
//!
//! Readings are `raw * scale` in m/s².

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use trigger_core::platform::{Accelerometer, PlatformError};
use trigger_core::{AccelReading, Input};

use super::{sleep_until, SensorClock, Worker};
use crate::dispatch::EventSink;

const AXES: [&str; 3] = ["x", "y", "z"];
const READ_FAILURE_WARN_EVERY: u64 = 100;

#[derive(Debug)]
pub struct IioDevice {
    root: PathBuf,
    scale: [f64; 3],
}

impl IioDevice {
    pub fn open(root: &Path) -> Result<Self, PlatformError> {
        for axis in AXES {
            let raw = raw_path(root, axis);
            if !raw.exists() {
                return Err(PlatformError::Unavailable(format!(
                    "no accelerometer channel {}",
                    raw.display()
                )));
            }
        }

        let shared_scale = read_number(&root.join("in_accel_scale")).ok();
        let mut scale = [1.0; 3];
        for (index, axis) in AXES.iter().enumerate() {
            let axis_scale = read_number(&root.join(format!("in_accel_{}_scale", axis))).ok();
            scale[index] = axis_scale.or(shared_scale).unwrap_or(1.0);
        }

        tracing::info!(device = %root.display(), ?scale, "IIO accelerometer opened");
        Ok(IioDevice {
            root: root.to_path_buf(),
            scale,
        })
    }

    pub fn read(&self) -> Result<[f32; 3], PlatformError> {
        let mut values = [0.0f32; 3];
        for (index, axis) in AXES.iter().enumerate() {
            let raw = read_number(&raw_path(&self.root, axis))?;
            values[index] = (raw * self.scale[index]) as f32;
        }
        Ok(values)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn raw_path(root: &Path, axis: &str) -> PathBuf {
    root.join(format!("in_accel_{}_raw", axis))
}

fn read_number(path: &Path) -> Result<f64, PlatformError> {
    let content = fs_err::read_to_string(path)
        .map_err(|err| PlatformError::Failed(err.to_string()))?;
    content.trim().parse::<f64>().map_err(|err| {
        PlatformError::Failed(format!("{}: {:?}: {}", path.display(), content.trim(), err))
    })
}

/// Polls the device at the window's sample rate while started.
pub struct IioAccelerometer {
    device: Arc<IioDevice>,
    sink: EventSink,
    clock: SensorClock,
    worker: Option<Worker>,
}

impl IioAccelerometer {
    pub fn new(device: Arc<IioDevice>, sink: EventSink, clock: SensorClock) -> Self {
        IioAccelerometer {
            device,
            sink,
            clock,
            worker: None,
        }
    }
}

impl Accelerometer for IioAccelerometer {
    fn start(&mut self, rate_hz: u32) -> Result<(), PlatformError> {
        if rate_hz == 0 {
            return Err(PlatformError::Failed("sample rate must be positive".to_string()));
        }
        if self.worker.is_some() {
            return Ok(());
        }

        let device = Arc::clone(&self.device);
        let sink = self.sink.clone();
        let clock = self.clock;
        let period = Duration::from_secs(1) / rate_hz;

        self.worker = Some(Worker::spawn("iio-sampler", move |stop| {
            let mut failures = 0u64;
            let mut next = Instant::now() + period;
            while sleep_until(next, &stop) {
                match device.read() {
                    Ok([x, y, z]) => {
                        let reading = AccelReading {
                            sensor_timestamp_ns: clock.now_ns(),
                            x,
                            y,
                            z,
                        };
                        if !sink.send(Input::Reading(reading)) {
                            break;
                        }
                    }
                    Err(err) => {
                        failures += 1;
                        if failures % READ_FAILURE_WARN_EVERY == 1 {
                            tracing::warn!(error = %err, failures, "Accelerometer read failed");
                        }
                    }
                }

                next += period;
                let now = Instant::now();
                if next < now {
                    // Fell behind (scheduler stall); resume from now rather than bursting.
                    next = now + period;
                }
            }
            tracing::debug!(stopped = stop.load(Ordering::SeqCst), "Sampler exiting");
        })?);

        tracing::debug!(rate_hz, "Accelerometer sampling started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.worker.take().is_some() {
            tracing::debug!("Accelerometer sampling stopped");
        }
    }
}
