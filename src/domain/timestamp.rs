//! Second-resolution timestamps used as bucket keys.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Whole seconds since the Unix epoch.
///
/// Every registered event is attributed to the second its registration time
/// floors to. Times before the epoch map to negative values, so ordering is
/// preserved across it.
///
/// # Examples
///
/// ```
/// use event_registry::SecondTimestamp;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let time = UNIX_EPOCH + Duration::from_millis(1_460_802_517_351);
/// let ts = SecondTimestamp::from_system_time(time);
/// assert_eq!(ts.as_secs(), 1_460_802_517);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecondTimestamp(i64);

impl SecondTimestamp {
    /// Create a timestamp from raw seconds since the epoch.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Truncate a wall-clock time to its second.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self(clamp_secs(since.as_secs())),
            Err(err) => {
                // Floor, not truncate toward zero: 0.5s before the epoch is second -1.
                let before = err.duration();
                let mut secs = clamp_secs(before.as_secs());
                if before.subsec_nanos() > 0 {
                    secs = secs.saturating_add(1);
                }
                Self(-secs)
            }
        }
    }

    /// Raw seconds since the epoch.
    pub const fn as_secs(self) -> i64 {
        self.0
    }

    /// The timestamp `secs` seconds earlier, saturating at `i64::MIN`.
    pub fn saturating_sub_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_sub(clamp_secs(secs)))
    }
}

impl fmt::Display for SecondTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

fn clamp_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}
