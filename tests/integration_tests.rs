use event_registry::{EventRegistry, Window, WindowCounts};
use std::thread;
use std::time::Duration;

#[tokio::test]
async fn test_single_event_counts_in_every_window() {
    let registry = EventRegistry::new();

    registry.register_event();

    assert_eq!(registry.events_last_minute(), 1);
    assert_eq!(registry.events_last_hour(), 1);
    assert_eq!(registry.events_last_day(), 1);

    registry.shutdown().await;
}

#[tokio::test]
async fn test_fresh_registry_reports_zero() {
    let registry = EventRegistry::new();

    assert_eq!(registry.counts(), WindowCounts::default());
    assert_eq!(registry.count(Window::from_secs(5)), 0);

    registry.shutdown().await;
}

#[tokio::test]
async fn test_event_leaves_short_window() {
    let registry = EventRegistry::new();
    let five_seconds = Window::from_secs(5);

    registry.register_event();
    assert_eq!(registry.count(five_seconds), 1);

    tokio::time::sleep(Duration::from_secs(6)).await;

    // Gone from the 5-second window, still inside the longer ones
    assert_eq!(registry.count(five_seconds), 0);
    assert_eq!(registry.events_last_minute(), 1);
    assert_eq!(registry.events_last_hour(), 1);
    assert_eq!(registry.events_last_day(), 1);

    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_massive_concurrent_registering() {
    const THREADS: usize = 8;
    const EVENTS_PER_THREAD: usize = 125_000;
    const TOTAL: u64 = (THREADS * EVENTS_PER_THREAD) as u64;

    let registry = EventRegistry::new();
    let mut handles = vec![];

    for _ in 0..THREADS {
        let registry = registry.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..EVENTS_PER_THREAD {
                registry.register_event();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.events_last_minute(), TOTAL);
    assert_eq!(registry.events_last_hour(), TOTAL);
    assert_eq!(registry.events_last_day(), TOTAL);
    assert_eq!(registry.metrics().events_registered(), TOTAL);

    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_queries_during_registration_stay_ordered() {
    let registry = EventRegistry::new();

    let writer = {
        let registry = registry.clone();
        thread::spawn(move || {
            for _ in 0..50_000 {
                registry.register_event();
            }
        })
    };

    for _ in 0..200 {
        let counts = registry.counts();
        assert!(counts.last_minute <= counts.last_hour);
        assert!(counts.last_hour <= counts.last_day);
        assert!(counts.last_day <= 50_000);
    }

    writer.join().unwrap();
    assert_eq!(registry.events_last_day(), 50_000);

    registry.shutdown().await;
}

#[tokio::test]
async fn test_events_spread_over_seconds() {
    let registry = EventRegistry::new();

    for _ in 0..3 {
        registry.register_event();
        registry.register_event();
        tokio::time::sleep(Duration::from_millis(1_100)).await;
    }

    assert!(registry.bucket_count() >= 3);
    assert_eq!(registry.events_last_minute(), 6);

    registry.shutdown().await;
}
