//! # event-registry
//!
//! In-memory, second-resolution event counting for "how many events happened
//! in the last minute / hour / day".
//!
//! Every registered event increments the bucket for the wall-clock second it
//! happened in. Queries sum the buckets of a window at call time, and a
//! background task evicts buckets that are older than the retention, so memory
//! stays bounded by one bucket per second of retained history.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use event_registry::EventRegistry;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // One day of retention, cleanup every minute, 10s shutdown timeout
//!     let registry = EventRegistry::new();
//!
//!     // Or customize:
//!     let registry = EventRegistry::builder()
//!         .with_retention(Duration::from_secs(3_600))
//!         .with_cleanup_interval(Duration::from_secs(30))
//!         .with_shutdown_timeout(Duration::from_secs(2))
//!         .build()
//!         .unwrap();
//!
//!     registry.register_event();
//!
//!     println!("last minute: {}", registry.events_last_minute());
//!     println!("last hour:   {}", registry.events_last_hour());
//!     println!("last day:    {}", registry.events_last_day());
//!
//!     registry.shutdown().await;
//! }
//! ```
//!
//! ## Windows
//!
//! A window query at second `now` covers the closed interval
//! `[now - window, now]`. An event registered exactly `window` seconds ago is
//! still counted. Any length can be queried through [`Window::from_secs`]:
//!
//! ```rust,no_run
//! # use event_registry::{EventRegistry, Window};
//! # async fn example(registry: EventRegistry) {
//! let last_five_seconds = registry.count(Window::from_secs(5));
//! # }
//! ```
//!
//! [`EventRegistry::counts`] reads all three named windows in one pass against
//! the same instant, so `last_minute <= last_hour <= last_day` holds for the
//! result even while cleanup runs.
//!
//! ## Concurrency
//!
//! - `register_event` and the getters are synchronous and infallible.
//! - Buckets live in a sharded map (`DashMap`). Increments to the same second
//!   are atomic; no operation locks the whole map.
//! - Queries are weakly consistent: each bucket is read exactly once and
//!   coherently, but registrations racing with a query may or may not be seen.
//!
//! ## Cleanup and Shutdown
//!
//! The cleanup task is spawned on the Tokio runtime the registry is built in.
//! It first runs after `retention + 1s`, then repeatedly with a fixed delay
//! between runs. Each run removes every bucket strictly older than
//! `now - retention`.
//!
//! [`EventRegistry::shutdown`] cancels future runs and waits up to the
//! shutdown timeout for a run in progress before aborting it. It never returns
//! an error; the [`ShutdownOutcome`] tells which path was taken, and problems
//! are logged through `tracing`. Dropping every clone of a registry without
//! calling `shutdown` also stops the task at its next wake-up.
//!
//! ## Observability
//!
//! ```rust,no_run
//! # use event_registry::EventRegistry;
//! # fn example(registry: &EventRegistry) {
//! let snapshot = registry.metrics().snapshot();
//! println!("registered: {}", snapshot.events_registered);
//! println!("cleanup runs: {}", snapshot.cleanup_runs);
//! println!("buckets evicted: {}", snapshot.buckets_evicted);
//! println!("live buckets: {}", registry.bucket_count());
//! # }
//! ```
//!
//! The crate emits `tracing` events (cleanup passes at `DEBUG`, forced
//! shutdowns at `WARN`, a panicked cleanup task at `ERROR`) and never installs
//! a subscriber itself.

// Domain layer - pure value types
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{timestamp::SecondTimestamp, window::Window};

pub use application::{
    cleanup::{
        CleanupConfig, CleanupConfigError, CleanupHandle, CleanupScheduler, ShutdownOutcome,
    },
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, Storage},
    query::{QueryEngine, WindowCounts},
    store::CounterStore,
};

pub use infrastructure::{
    clock::SystemClock,
    registry::{BuildError, EventRegistry, EventRegistryBuilder},
    storage::ShardedStorage,
};
