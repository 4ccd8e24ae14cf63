//! Windowed counting over the counter store.

use crate::application::ports::Storage;
use crate::application::store::CounterStore;
use crate::domain::timestamp::SecondTimestamp;
use crate::domain::window::Window;

/// Counts for the three named windows, all computed against one `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowCounts {
    /// Events in the last 60 seconds
    pub last_minute: u64,
    /// Events in the last 3 600 seconds
    pub last_hour: u64,
    /// Events in the last 86 400 seconds
    pub last_day: u64,
}

/// Computes windowed sums at call time.
#[derive(Debug, Clone)]
pub struct QueryEngine<S>
where
    S: Storage<SecondTimestamp, u64> + Clone,
{
    store: CounterStore<S>,
}

impl<S> QueryEngine<S>
where
    S: Storage<SecondTimestamp, u64> + Clone,
{
    /// Create a query engine reading from `store`.
    pub fn new(store: CounterStore<S>) -> Self {
        Self { store }
    }

    /// Number of events in `window`, ending now.
    pub fn count(&self, window: Window) -> u64 {
        self.count_at(window, self.store.now())
    }

    /// Number of events in `window`, ending at `now`.
    pub fn count_at(&self, window: Window, now: SecondTimestamp) -> u64 {
        let (start, end) = window.bounds(now);
        self.store.sum(start, end)
    }

    /// Counts for the minute, hour and day windows.
    ///
    /// All three are computed in a single pass against the same `now`, so
    /// `last_minute <= last_hour <= last_day` holds even while registrations
    /// or cleanup run concurrently.
    pub fn counts(&self) -> WindowCounts {
        let [last_minute, last_hour, last_day] = self.store.nested_sums(
            self.store.now(),
            [
                Window::LAST_MINUTE.as_secs(),
                Window::LAST_HOUR.as_secs(),
                Window::LAST_DAY.as_secs(),
            ],
        );
        WindowCounts {
            last_minute,
            last_hour,
            last_day,
        }
    }
}
