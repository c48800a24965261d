use chrono::Utc;

pub trait TimeSource {
    /// Seconds since the Unix epoch, with millisecond precision in the fraction.
    fn unix_timestamp(&self) -> f64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn unix_timestamp(&self) -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }
}
