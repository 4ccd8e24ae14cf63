//! Lookback windows for counting queries.

use crate::domain::timestamp::SecondTimestamp;
use std::fmt;
use std::time::Duration;

/// A lookback duration, in whole seconds, over which buckets are summed.
///
/// A window query at `now` covers the closed interval
/// `[now - secs, now]`, so an event registered exactly `secs` seconds ago
/// is still counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Window {
    secs: u64,
}

impl Window {
    /// The last 60 seconds.
    pub const LAST_MINUTE: Window = Window::from_secs(60);
    /// The last 3 600 seconds.
    pub const LAST_HOUR: Window = Window::from_secs(3_600);
    /// The last 86 400 seconds. Also the default retention.
    pub const LAST_DAY: Window = Window::from_secs(86_400);

    /// Create a window spanning `secs` seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    /// Length of the window in seconds.
    pub const fn as_secs(self) -> u64 {
        self.secs
    }

    /// Length of the window as a `Duration`.
    pub const fn as_duration(self) -> Duration {
        Duration::from_secs(self.secs)
    }

    /// Inclusive `(start, end)` bounds of this window ending at `now`.
    pub fn bounds(self, now: SecondTimestamp) -> (SecondTimestamp, SecondTimestamp) {
        (now.saturating_sub_secs(self.secs), now)
    }
}

impl From<Duration> for Window {
    /// Sub-second parts are dropped.
    fn from(duration: Duration) -> Self {
        Self::from_secs(duration.as_secs())
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Window::LAST_MINUTE => write!(f, "last minute"),
            Window::LAST_HOUR => write!(f, "last hour"),
            Window::LAST_DAY => write!(f, "last day"),
            Window { secs } => write!(f, "last {}s", secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_windows() {
        assert_eq!(Window::LAST_MINUTE.as_secs(), 60);
        assert_eq!(Window::LAST_HOUR.as_secs(), 3_600);
        assert_eq!(Window::LAST_DAY.as_secs(), 86_400);
        assert!(Window::LAST_MINUTE < Window::LAST_HOUR);
        assert!(Window::LAST_HOUR < Window::LAST_DAY);
    }

    #[test]
    fn test_bounds_are_inclusive_span() {
        let now = SecondTimestamp::from_secs(1_000);
        let (start, end) = Window::from_secs(5).bounds(now);

        assert_eq!(start.as_secs(), 995);
        assert_eq!(end, now);
    }

    #[test]
    fn test_from_duration_drops_subsec() {
        let window = Window::from(Duration::from_millis(5_900));
        assert_eq!(window.as_secs(), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(Window::LAST_HOUR.to_string(), "last hour");
        assert_eq!(Window::from_secs(5).to_string(), "last 5s");
    }
}
