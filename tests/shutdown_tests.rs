//! Integration tests for cleanup and graceful shutdown.

use event_registry::{EventRegistry, ShutdownOutcome};
use std::time::Duration;

#[tokio::test]
async fn test_cleanup_evicts_expired_buckets() {
    let registry = EventRegistry::builder()
        .with_retention(Duration::from_secs(3))
        .with_initial_cleanup_delay(Duration::from_millis(500))
        .with_cleanup_interval(Duration::from_millis(500))
        .build()
        .unwrap();

    registry.register_event();
    assert_eq!(registry.events_last_minute(), 1);

    // retention (3s) + bucket truncation (<1s) + one cleanup interval
    tokio::time::sleep(Duration::from_millis(5_500)).await;

    assert_eq!(registry.events_last_minute(), 0);
    assert_eq!(registry.events_last_day(), 0);
    assert_eq!(registry.bucket_count(), 0);
    assert_eq!(registry.metrics().buckets_evicted(), 1);

    assert_eq!(registry.shutdown().await, ShutdownOutcome::Graceful);
}

#[tokio::test]
async fn test_cleanup_keeps_buckets_inside_retention() {
    let registry = EventRegistry::builder()
        .with_retention(Duration::from_secs(60))
        .with_initial_cleanup_delay(Duration::from_millis(50))
        .with_cleanup_interval(Duration::from_millis(50))
        .build()
        .unwrap();

    registry.register_event();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(registry.metrics().cleanup_runs() >= 1);
    assert_eq!(registry.metrics().buckets_evicted(), 0);
    assert_eq!(registry.events_last_minute(), 1);

    registry.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_future_runs() {
    let registry = EventRegistry::builder()
        .with_retention(Duration::from_secs(60))
        .with_initial_cleanup_delay(Duration::from_millis(20))
        .with_cleanup_interval(Duration::from_millis(20))
        .build()
        .unwrap();

    registry.register_event();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(registry.shutdown().await, ShutdownOutcome::Graceful);
    let runs_at_shutdown = registry.metrics().cleanup_runs();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.metrics().cleanup_runs(), runs_at_shutdown);
    assert!(!registry.is_running());
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let registry = EventRegistry::new();

    assert_eq!(registry.shutdown().await, ShutdownOutcome::Graceful);
    assert_eq!(registry.shutdown().await, ShutdownOutcome::AlreadyStopped);
    assert_eq!(registry.shutdown().await, ShutdownOutcome::AlreadyStopped);
}

#[tokio::test]
async fn test_shutdown_leaves_data_queryable() {
    let registry = EventRegistry::new();
    for _ in 0..10 {
        registry.register_event();
    }

    registry.shutdown().await;

    assert_eq!(registry.events_last_minute(), 10);
    assert!(registry.bucket_count() >= 1);

    // Registration keeps working without the cleanup task
    registry.register_event();
    assert_eq!(registry.events_last_day(), 11);
}

#[tokio::test]
async fn test_explicit_shutdown_in_application() {
    // Simulate a host service that owns a registry and stops it on exit
    struct Application {
        requests: EventRegistry,
    }

    impl Application {
        fn new() -> Self {
            Self {
                requests: EventRegistry::builder()
                    .with_shutdown_timeout(Duration::from_secs(1))
                    .build()
                    .expect("valid configuration"),
            }
        }

        fn handle_request(&self) {
            self.requests.register_event();
        }

        async fn shutdown(self) -> ShutdownOutcome {
            self.requests.shutdown().await
        }
    }

    let app = Application::new();
    for _ in 0..5 {
        app.handle_request();
    }
    assert_eq!(app.requests.events_last_hour(), 5);

    assert_eq!(app.shutdown().await, ShutdownOutcome::Graceful);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shutdown_from_clones() {
    let registry = EventRegistry::builder()
        .with_initial_cleanup_delay(Duration::from_millis(10))
        .with_cleanup_interval(Duration::from_millis(10))
        .build()
        .unwrap();
    registry.register_event();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut tasks = vec![];
    for _ in 0..5 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move { registry.shutdown().await }));
    }

    let mut outcomes = vec![];
    for task in tasks {
        outcomes.push(task.await.unwrap());
    }

    // Exactly one caller stops the task; everyone else sees it stopped
    let graceful = outcomes
        .iter()
        .filter(|outcome| **outcome == ShutdownOutcome::Graceful)
        .count();
    let already_stopped = outcomes
        .iter()
        .filter(|outcome| **outcome == ShutdownOutcome::AlreadyStopped)
        .count();
    assert_eq!(graceful, 1);
    assert_eq!(already_stopped, 4);
    assert_eq!(registry.events_last_minute(), 1);
}
