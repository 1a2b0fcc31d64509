//! End-to-end registry tests: counters, EWMAs, and sliding windows
//! registered by path and tags, updated from many threads, then visited
//! and aggregated.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::rstest;

use tidemark_metrics::{
    MetricPath, MetricsRegistry, Snapshot, TagCollection,
};

#[test]
fn test_counter_updates_from_many_threads() {
    let registry = Arc::new(MetricsRegistry::new());

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let counter = registry
                    .counter("worker.iterations", TagCollection::new())
                    .unwrap();
                for _ in 0..10_000 {
                    counter.inc();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let counter = registry
        .counter("worker.iterations", TagCollection::new())
        .unwrap();
    assert_eq!(counter.value(), 80_000);
}

#[test]
fn test_window_records_from_many_threads() {
    let registry = Arc::new(MetricsRegistry::new());

    let workers: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let latency = registry
                    .window(
                        "api.latency",
                        Duration::from_secs(3600),
                        TagCollection::new(),
                    )
                    .unwrap();
                for i in 0..1000 {
                    latency.record((t * 1000 + i) as f64);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let latency = registry
        .window(
            "api.latency",
            Duration::from_secs(3600),
            TagCollection::new(),
        )
        .unwrap();

    let snapshot = latency.snapshot();
    assert_eq!(snapshot.count(), 8000);
    assert_eq!(snapshot.min(), Some(0.0));
    assert_eq!(snapshot.max(), Some(7999.0));

    // Every recorded value made it in exactly once and in order.
    let values = snapshot.values();
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    let distinct: HashSet<u64> = values.iter().map(|v| *v as u64).collect();
    assert_eq!(distinct.len(), 8000);
}

#[test]
fn test_visit_sees_every_permutation() {
    let registry = MetricsRegistry::new();

    for zone in ["eu", "us"] {
        let counter = registry
            .counter("api.requests", TagCollection::new().with("zone", zone))
            .unwrap();
        counter.incr(7);
    }
    let ewma = registry
        .ewma(
            "api.rate",
            Duration::from_secs(60),
            Duration::from_secs(5),
            TagCollection::new(),
        )
        .unwrap();
    ewma.mark(3.0);

    let mut visited: Vec<(String, String)> = Vec::new();
    registry.visit(|path, tags, snapshot| {
        match snapshot {
            Snapshot::Counter(count) => assert_eq!(count, 7),
            Snapshot::Ewma(_) => {}
            Snapshot::Window(_) => panic!("no window registered"),
        }
        visited.push((path.to_string(), tags.to_string()));
    });

    visited.sort();
    assert_eq!(
        visited,
        vec![
            ("api.rate".to_string(), "".to_string()),
            ("api.requests".to_string(), "zone=eu".to_string()),
            ("api.requests".to_string(), "zone=us".to_string()),
        ]
    );
}

#[test]
fn test_aggregate_merges_window_samples() {
    let registry = MetricsRegistry::new();

    for (host, base) in [("a", 0.0), ("b", 100.0)] {
        let window = registry
            .window(
                "db.query_time",
                Duration::from_secs(3600),
                TagCollection::new().with("host", host),
            )
            .unwrap();
        for i in 0..10 {
            window.record(base + i as f64);
        }
    }

    let merged = registry.aggregate(&MetricPath::from("db.query_time"));
    match merged {
        Some(Snapshot::Window(snapshot)) => {
            assert_eq!(snapshot.count(), 20);
            assert_eq!(snapshot.min(), Some(0.0));
            assert_eq!(snapshot.max(), Some(109.0));
        }
        other => panic!("expected a window snapshot, got {:?}", other),
    }
}

#[rstest]
#[case::flat("requests")]
#[case::nested("api.v2.requests.total")]
fn test_path_shapes_round_trip(#[case] path: &str) {
    let registry = MetricsRegistry::new();

    let counter = registry.counter(path, TagCollection::new()).unwrap();
    counter.inc();

    let mut seen = Vec::new();
    registry.visit(|visited_path, _tags, _snapshot| {
        seen.push(visited_path.to_string());
    });
    assert_eq!(seen, vec![path.to_string()]);
}

// The concurrent registry surface as a whole: threads race to register
// and update overlapping (path, tags) pairs of all three kinds.
#[test]
fn test_racing_registrations_converge() {
    let registry = Arc::new(MetricsRegistry::new());

    let workers: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let tags = TagCollection::new().with("shard", (t % 2).to_string());

                let counter = registry.counter("mixed.counter", tags.clone()).unwrap();
                counter.incr(10);

                let ewma = registry
                    .ewma(
                        "mixed.rate",
                        Duration::from_secs(60),
                        Duration::from_secs(5),
                        tags.clone(),
                    )
                    .unwrap();
                ewma.mark(1.0);

                let window = registry
                    .window("mixed.window", Duration::from_secs(3600), tags)
                    .unwrap();
                window.record(t as f64);
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(
        registry.aggregate(&"mixed.counter".into()),
        Some(Snapshot::Counter(80))
    );

    match registry.aggregate(&"mixed.window".into()) {
        Some(Snapshot::Window(snapshot)) => assert_eq!(snapshot.count(), 8),
        other => panic!("expected a window snapshot, got {:?}", other),
    }

    // Registering the same paths under a different kind still fails after
    // the dust settles.
    assert!(registry
        .window("mixed.counter", Duration::from_secs(1), TagCollection::new())
        .is_err());
}
