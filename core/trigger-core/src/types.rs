//! Shared value types: log records, readings, and observable states.

use serde::Serialize;

/// A timestamped lifecycle event as written to `Log.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp_ms: i64,
    pub label: String,
}

impl Event {
    pub fn new(timestamp_ms: i64, label: &str) -> Self {
        Event {
            timestamp_ms,
            label: sanitize_label(label),
        }
    }

    pub fn to_line(&self) -> String {
        format!("{},{}\n", self.timestamp_ms, self.label)
    }
}

/// One line per event: a label may contain commas but never a line break.
fn sanitize_label(label: &str) -> String {
    label.replace(['\r', '\n'], " ")
}

/// A raw accelerometer reading as delivered by the sensor (m/s²).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelReading {
    /// Sensor clock, nanoseconds.
    pub sensor_timestamp_ns: i64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AccelReading {
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A reading stamped with wall-clock time, as written to `data.txt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub sensor_timestamp_ns: i64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub wall_timestamp_ms: i64,
}

impl Sample {
    pub fn from_reading(reading: &AccelReading, wall_timestamp_ms: i64) -> Self {
        Sample {
            sensor_timestamp_ns: reading.sensor_timestamp_ns,
            x: reading.x,
            y: reading.y,
            z: reading.z,
            wall_timestamp_ms,
        }
    }

    pub fn to_row(&self) -> String {
        format!(
            "{},{},{},{},{}\n",
            self.sensor_timestamp_ns, self.x, self.y, self.z, self.wall_timestamp_ms
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    Armed,
    Fired,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    Idle,
    Running,
}

/// The three values pushed to the display surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub magnitude: f32,
    pub sample_count: u64,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_line_strips_line_breaks() {
        let event = Event::new(1_700_000_000_000, "trigger\nfired\r");
        assert_eq!(event.to_line(), "1700000000000,trigger fired \n");
    }

    #[test]
    fn sample_row_matches_data_file_layout() {
        let reading = AccelReading {
            sensor_timestamp_ns: 123_456_789,
            x: 0.5,
            y: -1.25,
            z: 9.81,
        };
        let sample = Sample::from_reading(&reading, 1_700_000_000_123);
        assert_eq!(sample.to_row(), "123456789,0.5,-1.25,9.81,1700000000123\n");
    }

    #[test]
    fn magnitude_of_gravity_vector() {
        let reading = AccelReading {
            sensor_timestamp_ns: 0,
            x: 3.0,
            y: 4.0,
            z: 0.0,
        };
        assert!((reading.magnitude() - 5.0).abs() < f32::EPSILON);
    }
}
