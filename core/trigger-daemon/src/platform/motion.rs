//! Software significant-motion trigger.
//!
//! Polls the accelerometer at a low rate and fires once when the smoothed
//! deviation of |a| from gravity stays above a threshold for a sustained
//! period. After firing it goes quiet until requested again, matching the
//! single-shot contract of a hardware significant-motion sensor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use trigger_core::platform::{MotionTrigger, PlatformError};
use trigger_core::Input;

use super::iio::IioDevice;
use super::{sleep_until, Worker};
use crate::config::MotionConfig;
use crate::dispatch::EventSink;

pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// Weight of the newest poll in the smoothed deviation.
const SMOOTHING: f32 = 0.3;
/// Below `threshold * HOLD_FACTOR` the sustained streak resets; between the two
/// it holds, so the gaps in a walking gait don't restart the count.
const HOLD_FACTOR: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorSettings {
    pub threshold_mps2: f32,
    pub sustain: Duration,
    pub poll_interval: Duration,
}

impl DetectorSettings {
    pub fn from_config(config: &MotionConfig) -> Self {
        DetectorSettings {
            threshold_mps2: config.threshold_mps2,
            sustain: Duration::from_millis(config.sustain_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    fn sustain_polls(&self) -> u32 {
        let poll_ms = self.poll_interval.as_millis().max(1);
        let polls = self.sustain.as_millis().div_ceil(poll_ms);
        polls.clamp(1, u32::MAX as u128) as u32
    }
}

#[derive(Debug)]
pub struct SignificantMotionDetector {
    threshold: f32,
    sustain_polls: u32,
    smoothed: Option<f32>,
    streak: u32,
}

impl SignificantMotionDetector {
    pub fn new(settings: &DetectorSettings) -> Self {
        SignificantMotionDetector {
            threshold: settings.threshold_mps2,
            sustain_polls: settings.sustain_polls(),
            smoothed: None,
            streak: 0,
        }
    }

    /// Feeds one magnitude; returns `true` when sustained motion is detected.
    pub fn push(&mut self, magnitude: f32) -> bool {
        let deviation = (magnitude - STANDARD_GRAVITY).abs();
        let smoothed = match self.smoothed {
            Some(previous) => previous + SMOOTHING * (deviation - previous),
            None => deviation,
        };
        self.smoothed = Some(smoothed);

        if smoothed >= self.threshold {
            self.streak += 1;
        } else if smoothed < self.threshold * HOLD_FACTOR {
            self.streak = 0;
        }
        self.streak >= self.sustain_polls
    }
}

pub struct IioMotionTrigger {
    device: Arc<IioDevice>,
    sink: EventSink,
    settings: DetectorSettings,
    worker: Option<Worker>,
}

impl IioMotionTrigger {
    pub fn new(device: Arc<IioDevice>, sink: EventSink, settings: DetectorSettings) -> Self {
        IioMotionTrigger {
            device,
            sink,
            settings,
            worker: None,
        }
    }
}

impl MotionTrigger for IioMotionTrigger {
    fn request(&mut self) -> Result<(), PlatformError> {
        if let Some(worker) = &self.worker {
            if !worker.is_finished() {
                return Ok(());
            }
        }
        // A fired worker has exited; drop it before starting the next one.
        self.worker = None;

        self.device.read()?;

        let device = Arc::clone(&self.device);
        let sink = self.sink.clone();
        let settings = self.settings;
        self.worker = Some(Worker::spawn("motion-trigger", move |stop| {
            let mut detector = SignificantMotionDetector::new(&settings);
            let mut next = Instant::now() + settings.poll_interval;
            while sleep_until(next, &stop) {
                next += settings.poll_interval;
                let [x, y, z] = match device.read() {
                    Ok(values) => values,
                    Err(err) => {
                        tracing::debug!(error = %err, "Motion poll read failed");
                        continue;
                    }
                };
                if detector.push((x * x + y * y + z * z).sqrt()) {
                    tracing::debug!("Significant motion detected");
                    sink.send(Input::MotionFired);
                    return;
                }
            }
        })?);
        Ok(())
    }

    fn cancel(&mut self) {
        self.worker = None;
    }
}
