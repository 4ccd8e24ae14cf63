//! Periodic eviction of expired buckets.
//!
//! A single background task removes buckets that fell below the retention
//! floor. Runs are separated by a fixed delay, and the first run is deferred
//! since nothing can expire before one retention period has passed.

use crate::application::ports::Storage;
use crate::application::store::CounterStore;
use crate::domain::timestamp::SecondTimestamp;
use crate::domain::window::Window;
use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Error returned when cleanup configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupConfigError {
    /// Retention must be at least one whole second
    ZeroRetention,
    /// Delay between cleanup runs must be greater than zero
    ZeroCleanupInterval,
    /// Shutdown wait must be greater than zero
    ZeroShutdownTimeout,
}

impl fmt::Display for CleanupConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupConfigError::ZeroRetention => {
                write!(f, "retention must be at least one second")
            }
            CleanupConfigError::ZeroCleanupInterval => {
                write!(f, "cleanup interval must be greater than 0")
            }
            CleanupConfigError::ZeroShutdownTimeout => {
                write!(f, "shutdown timeout must be greater than 0")
            }
        }
    }
}

impl std::error::Error for CleanupConfigError {}

/// Configuration for bucket retention and the cleanup task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    /// How much history to keep. Sub-second parts are ignored.
    pub retention: Duration,
    /// Delay between the end of one run and the start of the next
    pub interval: Duration,
    /// Delay before the first run
    pub initial_delay: Duration,
    /// How long shutdown waits for an in-flight run before aborting it
    pub shutdown_timeout: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        let retention = Window::LAST_DAY.as_duration();
        Self {
            retention,
            interval: Duration::from_secs(60),
            initial_delay: retention.saturating_add(Duration::from_secs(1)),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl CleanupConfig {
    /// Create a config keeping `retention` worth of history.
    ///
    /// The first run is deferred by `retention + 1s`; other settings take
    /// their defaults.
    ///
    /// # Errors
    /// Returns `CleanupConfigError::ZeroRetention` if `retention` is below one second.
    pub fn new(retention: Duration) -> Result<Self, CleanupConfigError> {
        if retention.as_secs() == 0 {
            return Err(CleanupConfigError::ZeroRetention);
        }
        Ok(Self {
            retention,
            initial_delay: retention.saturating_add(Duration::from_secs(1)),
            ..Self::default()
        })
    }

    /// Set the delay between runs.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the delay before the first run.
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Set the bounded wait used by shutdown.
    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Retention in whole seconds.
    pub fn retention_secs(&self) -> u64 {
        self.retention.as_secs()
    }

    /// Check every setting.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), CleanupConfigError> {
        if self.retention.as_secs() == 0 {
            return Err(CleanupConfigError::ZeroRetention);
        }
        if self.interval.is_zero() {
            return Err(CleanupConfigError::ZeroCleanupInterval);
        }
        if self.shutdown_timeout.is_zero() {
            return Err(CleanupConfigError::ZeroShutdownTimeout);
        }
        Ok(())
    }
}

/// How a cleanup task ended when it was shut down.
///
/// Shutdown never fails from the caller's point of view; this value only
/// reports which path was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The task observed the stop signal and exited within the timeout
    Graceful,
    /// The timeout elapsed and the task was aborted
    Forced,
    /// The task had already terminated by panicking
    Panicked,
    /// Shutdown had already been requested earlier
    AlreadyStopped,
}

/// Evicts buckets older than the retention floor.
#[derive(Debug)]
pub struct CleanupScheduler<S>
where
    S: Storage<SecondTimestamp, u64> + Clone,
{
    store: CounterStore<S>,
    config: CleanupConfig,
}

impl<S> CleanupScheduler<S>
where
    S: Storage<SecondTimestamp, u64> + Clone,
{
    /// Create a scheduler for `store`.
    pub fn new(store: CounterStore<S>, config: CleanupConfig) -> Self {
        Self { store, config }
    }

    /// Run a single cleanup pass now.
    ///
    /// Does nothing on an empty store. Otherwise removes every bucket strictly
    /// below `now - retention` and returns how many were removed.
    pub fn run_once(&self) -> usize {
        if self.store.is_empty() {
            return 0;
        }

        let floor = self
            .store
            .now()
            .saturating_sub_secs(self.config.retention_secs());
        let evicted = self.store.remove_below(floor);
        self.store.metrics().record_cleanup(evicted);

        debug!(
            floor = %floor,
            evicted,
            remaining = self.store.len(),
            "cleanup pass complete"
        );
        evicted
    }

    /// Spawn the periodic cleanup task on `runtime`.
    ///
    /// The runtime must have its time driver enabled; otherwise the task
    /// panics at its first sleep. The task stops when
    /// [`CleanupHandle::shutdown`] is called or when the handle is dropped,
    /// whichever comes first. The stop signal is only observed between runs.
    pub fn start(self, runtime: &Handle) -> CleanupHandle
    where
        S: Send + Sync + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let shutdown_timeout = self.config.shutdown_timeout;

        let task = runtime.spawn(async move {
            debug!(
                initial_delay_ms = self.config.initial_delay.as_millis() as u64,
                interval_ms = self.config.interval.as_millis() as u64,
                "cleanup scheduler started"
            );

            let mut delay = self.config.initial_delay;
            loop {
                tokio::select! {
                    biased;
                    // Err means the handle was dropped; stop as well.
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                self.run_once();
                delay = self.config.interval;
            }

            debug!("cleanup scheduler stopped");
        });

        CleanupHandle {
            shutdown_tx,
            task,
            shutdown_timeout,
        }
    }
}

/// Owner of a running cleanup task.
#[derive(Debug)]
pub struct CleanupHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl CleanupHandle {
    /// Whether the task has terminated.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task.
    ///
    /// Future runs are cancelled immediately. A run in progress gets up to the
    /// configured shutdown timeout to finish; after that the task is aborted.
    /// Neither path is reported as an error: timeouts and panics are logged
    /// and reflected in the returned outcome.
    ///
    /// A cleanup pass is synchronous, so aborting only takes effect once the
    /// pass returns. After [`ShutdownOutcome::Forced`] the stalled pass may
    /// still be evicting buckets in the background. On a current-thread
    /// runtime the timeout itself cannot fire until that pass completes.
    pub async fn shutdown(self) -> ShutdownOutcome {
        // Fails only if the task already exited and dropped its receiver.
        let _ = self.shutdown_tx.send(true);

        let mut task = self.task;
        match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => ShutdownOutcome::Graceful,
            Ok(Err(err)) if err.is_panic() => {
                error!(error = %err, "cleanup task panicked");
                ShutdownOutcome::Panicked
            }
            Ok(Err(_)) => ShutdownOutcome::Forced,
            Err(_) => {
                warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "cleanup task did not stop in time, aborting"
                );
                task.abort();
                ShutdownOutcome::Forced
            }
        }
    }
}
