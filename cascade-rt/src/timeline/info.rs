//! Tick to wall-clock conversions.

// Layer 1: Standard library imports
use std::cmp::Ordering;

// Layer 2: Third-party crate imports
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// A simulation timestamp in abstract ticks.
///
/// The core only ever compares ticks; [`TimelineInfo`] converts them to and
/// from wall-clock seconds for external consumers.
pub type Timestamp = i64;

/// Conversion parameters between simulation ticks and wall-clock time.
///
/// `reference` is the unix time of tick 0; one tick spans `time_scale`
/// seconds. The simulation runs from `start_time` for `duration` ticks.
///
/// # Example
///
/// ```rust
/// use cascade_rt::timeline::TimelineInfo;
///
/// let info = TimelineInfo::new(0.0, 3600.0, 0, 24);
/// assert_eq!(info.end_time(), 24);
/// assert_eq!(info.timestamp_to_seconds(2), 7200.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineInfo {
    pub reference: f64,
    pub time_scale: f64,
    pub start_time: Timestamp,
    pub duration: Timestamp,
}

impl TimelineInfo {
    pub fn new(reference: f64, time_scale: f64, start_time: Timestamp, duration: Timestamp) -> Self {
        Self {
            reference,
            time_scale,
            start_time,
            duration,
        }
    }

    /// The last tick of the simulation.
    pub fn end_time(&self) -> Timestamp {
        self.start_time + self.duration
    }

    pub fn timestamp_to_seconds(&self, timestamp: Timestamp) -> f64 {
        self.time_scale * timestamp as f64
    }

    pub fn seconds_to_timestamp(&self, seconds: f64) -> Timestamp {
        (seconds / self.time_scale) as Timestamp
    }

    pub fn timestamp_to_unix_time(&self, timestamp: Timestamp) -> f64 {
        self.reference + self.timestamp_to_seconds(timestamp)
    }

    pub fn unix_time_to_timestamp(&self, unix_time: f64) -> Timestamp {
        self.seconds_to_timestamp(unix_time - self.reference)
    }

    pub fn timestamp_to_datetime(&self, timestamp: Timestamp) -> Option<DateTime<Utc>> {
        let unix = self.timestamp_to_unix_time(timestamp);
        Utc.timestamp_opt(unix as i64, 0).single()
    }

    pub fn datetime_to_timestamp(&self, datetime: DateTime<Utc>) -> Timestamp {
        self.unix_time_to_timestamp(datetime.timestamp() as f64)
    }

    pub fn is_at_beginning(&self, timestamp: Timestamp) -> bool {
        timestamp == self.start_time
    }
}

/// A single instant on the simulation timeline, carrying the frozen
/// conversion parameters handed to a model process at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moment {
    pub timestamp: Timestamp,
    pub info: TimelineInfo,
}

impl Moment {
    pub fn new(timestamp: Timestamp, info: TimelineInfo) -> Self {
        Self { timestamp, info }
    }

    /// Seconds since tick 0.
    pub fn seconds(&self) -> f64 {
        self.info.timestamp_to_seconds(self.timestamp)
    }

    /// The wall-clock instant this moment maps to.
    pub fn world_time(&self) -> f64 {
        self.info.timestamp_to_unix_time(self.timestamp)
    }

    pub fn is_at_beginning(&self) -> bool {
        self.info.is_at_beginning(self.timestamp)
    }
}

impl PartialOrd for Moment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.timestamp.partial_cmp(&other.timestamp)
    }
}
