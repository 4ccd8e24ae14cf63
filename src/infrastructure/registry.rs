//! The embeddable event registry.
//!
//! Wires the counter store, query engine and cleanup task together behind a
//! small synchronous API, plus an async `shutdown`.

use crate::application::{
    cleanup::{CleanupConfig, CleanupConfigError, CleanupHandle, CleanupScheduler, ShutdownOutcome},
    metrics::Metrics,
    ports::{Clock, Storage},
    query::{QueryEngine, WindowCounts},
    store::CounterStore,
};
use crate::domain::{timestamp::SecondTimestamp, window::Window};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::ShardedStorage;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;

/// Error returned when building an `EventRegistry` fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Cleanup configuration validation failed
    Config(CleanupConfigError),
    /// No Tokio runtime is available to run the cleanup task
    NoRuntime,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Config(e) => {
                write!(f, "cleanup configuration error: {}", e)
            }
            BuildError::NoRuntime => {
                write!(f, "event registry must be built inside a Tokio runtime")
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Config(e) => Some(e),
            BuildError::NoRuntime => None,
        }
    }
}

impl From<CleanupConfigError> for BuildError {
    fn from(e: CleanupConfigError) -> Self {
        BuildError::Config(e)
    }
}

/// Builder for constructing an `EventRegistry`.
#[derive(Debug)]
pub struct EventRegistryBuilder {
    retention: Duration,
    cleanup_interval: Duration,
    initial_cleanup_delay: Option<Duration>,
    shutdown_timeout: Duration,
    clock: Option<Arc<dyn Clock>>,
    initial_capacity: Option<usize>,
    runtime: Option<Handle>,
}

impl EventRegistryBuilder {
    /// Set how much history is kept.
    ///
    /// Buckets older than this are evicted by the cleanup task. Queries over
    /// longer windows only see what is retained.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Set the delay between cleanup runs.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set the delay before the first cleanup run.
    ///
    /// Defaults to the retention plus one second.
    pub fn with_initial_cleanup_delay(mut self, delay: Duration) -> Self {
        self.initial_cleanup_delay = Some(delay);
        self
    }

    /// Set how long `shutdown` waits for an in-flight cleanup run.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Pre-size the bucket map.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Spawn the cleanup task on `runtime` instead of the ambient one.
    ///
    /// The runtime must be built with its time driver enabled
    /// (`enable_time` or `enable_all`). Tokio gives no way to check this up
    /// front, and without it both the cleanup task and `shutdown` panic.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the registry and start its cleanup task.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid or no Tokio
    /// runtime is available.
    pub fn build(self) -> Result<EventRegistry, BuildError> {
        let mut config = CleanupConfig::new(self.retention)?
            .with_interval(self.cleanup_interval)
            .with_shutdown_timeout(self.shutdown_timeout);
        if let Some(delay) = self.initial_cleanup_delay {
            config = config.with_initial_delay(delay);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let storage = Arc::new(match self.initial_capacity {
            Some(capacity) => ShardedStorage::with_capacity(capacity),
            None => ShardedStorage::new(),
        });

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };

        EventRegistry::start(storage, clock, config, &runtime)
    }
}

/// In-memory event counter with minute, hour and day windows.
///
/// Each event is attributed to the wall-clock second it was registered in.
/// Queries sum the buckets of a window at call time; a background task
/// evicts buckets that are older than the retention (one day by default).
///
/// Registration and queries are synchronous, never fail, and may be called
/// from any number of threads. Clones share the same buckets and cleanup task.
///
/// # Examples
///
/// ```
/// use event_registry::EventRegistry;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = EventRegistry::new();
///
/// registry.register_event();
/// registry.register_event();
///
/// assert_eq!(registry.events_last_minute(), 2);
/// assert_eq!(registry.events_last_day(), 2);
///
/// registry.shutdown().await;
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EventRegistry<S = Arc<ShardedStorage<SecondTimestamp, u64>>>
where
    S: Storage<SecondTimestamp, u64> + Clone,
{
    store: CounterStore<S>,
    query: QueryEngine<S>,
    config: CleanupConfig,
    cleanup: Arc<Mutex<Option<CleanupHandle>>>,
}

impl<S> EventRegistry<S>
where
    S: Storage<SecondTimestamp, u64> + Clone,
{
    /// Create a registry over a custom storage backend.
    ///
    /// The cleanup task is spawned on the current Tokio runtime.
    ///
    /// # Errors
    /// Returns `BuildError` if `config` is invalid or no Tokio runtime is
    /// available.
    pub fn with_storage(
        storage: S,
        clock: Arc<dyn Clock>,
        config: CleanupConfig,
    ) -> Result<Self, BuildError>
    where
        S: Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| BuildError::NoRuntime)?;
        Self::start(storage, clock, config, &runtime)
    }

    fn start(
        storage: S,
        clock: Arc<dyn Clock>,
        config: CleanupConfig,
        runtime: &Handle,
    ) -> Result<Self, BuildError>
    where
        S: Send + Sync + 'static,
    {
        config.validate()?;

        let store = CounterStore::new(storage, clock, Metrics::new());
        let query = QueryEngine::new(store.clone());
        let handle = CleanupScheduler::new(store.clone(), config.clone()).start(runtime);

        Ok(Self {
            store,
            query,
            config,
            cleanup: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Record one event at the current instant.
    pub fn register_event(&self) {
        self.store.register_event();
    }

    /// Number of events in the last 60 seconds.
    pub fn events_last_minute(&self) -> u64 {
        self.query.count(Window::LAST_MINUTE)
    }

    /// Number of events in the last 3 600 seconds.
    pub fn events_last_hour(&self) -> u64 {
        self.query.count(Window::LAST_HOUR)
    }

    /// Number of events in the last 86 400 seconds.
    pub fn events_last_day(&self) -> u64 {
        self.query.count(Window::LAST_DAY)
    }

    /// Number of events in an arbitrary window ending now.
    ///
    /// Windows longer than the retention only see retained buckets.
    pub fn count(&self, window: Window) -> u64 {
        self.query.count(window)
    }

    /// Minute, hour and day counts computed against the same instant.
    pub fn counts(&self) -> WindowCounts {
        self.query.counts()
    }

    /// Number of live per-second buckets.
    pub fn bucket_count(&self) -> usize {
        self.store.len()
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        self.store.metrics()
    }

    /// Get the cleanup configuration.
    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Whether the cleanup task is still running.
    pub fn is_running(&self) -> bool {
        self.cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the background cleanup task.
    ///
    /// Cancels future runs, waits up to the configured shutdown timeout for a
    /// run in progress, then aborts it. Calling this again, from any clone,
    /// returns `ShutdownOutcome::AlreadyStopped`. Stored buckets are left
    /// untouched and stay queryable.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        // Take the handle while holding the lock, then release the lock before awaiting
        let handle = self
            .cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handle {
            Some(handle) => handle.shutdown().await,
            None => ShutdownOutcome::AlreadyStopped,
        }
    }
}

impl EventRegistry<Arc<ShardedStorage<SecondTimestamp, u64>>> {
    /// Create a builder for configuring the registry.
    ///
    /// Defaults:
    /// - Retention: 1 day
    /// - Cleanup interval: 60 seconds
    /// - Initial cleanup delay: retention + 1 second
    /// - Shutdown timeout: 10 seconds
    /// - Clock: `SystemClock`
    pub fn builder() -> EventRegistryBuilder {
        let defaults = CleanupConfig::default();
        EventRegistryBuilder {
            retention: defaults.retention,
            cleanup_interval: defaults.interval,
            initial_cleanup_delay: None,
            shutdown_timeout: defaults.shutdown_timeout,
            clock: None,
            initial_capacity: None,
            runtime: None,
        }
    }

    /// Create a registry with default settings.
    ///
    /// Equivalent to `EventRegistry::builder().build().unwrap()`.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime, like `tokio::spawn`. Use
    /// [`EventRegistry::builder`] to handle that case as an error.
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("EventRegistry::new must be called from within a Tokio runtime")
    }
}

impl Default for EventRegistry<Arc<ShardedStorage<SecondTimestamp, u64>>> {
    fn default() -> Self {
        Self::new()
    }
}
