//! The global timeline controller.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::info::{TimelineInfo, Timestamp};

/// Owns the simulation clock: the closed tick range and the instant the
/// simulation currently sits at.
///
/// The controller validates every wake-up request a model makes. Requests
/// in the past are dropped, requests beyond the end are clamped to the end,
/// and once the clock sits at the end no request past it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineController {
    start: Timestamp,
    end: Timestamp,
    current_time: Option<Timestamp>,
}

impl TimelineController {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end,
            current_time: None,
        }
    }

    pub fn from_info(info: &TimelineInfo) -> Self {
        Self::new(info.start_time, info.end_time())
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn current_time(&self) -> Option<Timestamp> {
        self.current_time
    }

    /// The wake-up time for a freshly registered model: the simulation
    /// start.
    pub fn start_time(&self) -> Timestamp {
        self.start
    }

    /// Validate a model's requested next wake-up time.
    ///
    /// Returns `None` (no further wake-up) when the request is absent, lies
    /// before the current time, or asks past the end while the clock
    /// already sits at the end. Otherwise the request, clamped to the end.
    pub fn validated_next_time(&self, next_time: Option<Timestamp>) -> Option<Timestamp> {
        let current = self.current_time.unwrap_or(self.start);
        match next_time {
            None => None,
            Some(t) if t < current => None,
            Some(t) if current == self.end && t > self.end => None,
            Some(t) => Some(t.min(self.end)),
        }
    }

    /// Move the clock to `time`. Returns `true` when this changed the
    /// current instant (and a `NEW_TIME` broadcast is due).
    pub fn advance_to(&mut self, time: Timestamp) -> bool {
        if self.current_time == Some(time) {
            false
        } else {
            self.current_time = Some(time);
            true
        }
    }

    #[cfg(test)]
    pub(crate) fn with_current(start: Timestamp, end: Timestamp, current: Timestamp) -> Self {
        Self {
            start,
            end,
            current_time: Some(current),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_validates_plain_request() {
        let timeline = TimelineController::new(1, 10);
        assert_eq!(timeline.validated_next_time(Some(2)), Some(2));
    }

    #[test]
    fn test_clamps_request_to_end() {
        let timeline = TimelineController::new(1, 10);
        assert_eq!(timeline.validated_next_time(Some(11)), Some(10));
    }

    #[test]
    fn test_drops_request_in_past() {
        let timeline = TimelineController::with_current(1, 10, 5);
        assert_eq!(timeline.validated_next_time(Some(3)), None);
    }

    #[test]
    fn test_clamps_to_end_near_end() {
        let timeline = TimelineController::with_current(1, 10, 9);
        assert_eq!(timeline.validated_next_time(Some(11)), Some(10));
    }

    #[test]
    fn test_accepts_end_time_at_end_time() {
        let timeline = TimelineController::with_current(1, 10, 10);
        assert_eq!(timeline.validated_next_time(Some(10)), Some(10));
    }

    #[test]
    fn test_drops_request_beyond_end_at_end_time() {
        let timeline = TimelineController::with_current(1, 10, 10);
        assert_eq!(timeline.validated_next_time(Some(11)), None);
    }

    #[test]
    fn test_accepts_current_time_request() {
        let timeline = TimelineController::with_current(1, 20, 10);
        assert_eq!(timeline.validated_next_time(Some(10)), Some(10));
    }

    #[test]
    fn test_none_request_stays_none() {
        let timeline = TimelineController::new(0, 10);
        assert_eq!(timeline.validated_next_time(None), None);
    }

    #[test]
    fn test_baseline_is_start_before_first_advance() {
        let timeline = TimelineController::new(5, 10);
        assert_eq!(timeline.validated_next_time(Some(3)), None);
        assert_eq!(timeline.validated_next_time(Some(5)), Some(5));
    }

    #[test]
    fn test_advance_reports_change() {
        let mut timeline = TimelineController::new(0, 10);
        assert!(timeline.advance_to(0));
        assert!(!timeline.advance_to(0));
        assert!(timeline.advance_to(1));
        assert_eq!(timeline.current_time(), Some(1));
    }

    #[test]
    fn test_from_info() {
        let info = TimelineInfo::new(0.0, 1.0, 2, 8);
        let timeline = TimelineController::from_info(&info);
        assert_eq!(timeline.start(), 2);
        assert_eq!(timeline.end(), 10);
        assert_eq!(timeline.current_time(), None);
    }
}
