use std::{sync::Arc, thread};

use proptest::{collection::vec as arb_vec, prelude::*};
use tablet_metrics::{
    tablet::{self, catalog::*, ProbeStats, TabletMetrics},
    Counter, DescriptorRegistry, MetricRegistry,
};

fn tablet_metrics(id: &str) -> TabletMetrics {
    let mut descriptors = DescriptorRegistry::builder();
    tablet::register_descriptors(&mut descriptors).expect("tablet catalog should register");
    let registry = MetricRegistry::new(descriptors.build());
    let ctx = registry.find_or_create_context(tablet::ENTITY_TYPE, id);
    TabletMetrics::new(&ctx).expect("tablet metrics should bind")
}

fn arb_probe_stats() -> impl Strategy<Value = ProbeStats> {
    (0u64..=20, 0u64..=20, 0u64..=20, 0u64..=1_000)
        .prop_map(|(b, k, d, m)| ProbeStats::new(b, k, d, m))
}

proptest! {
    #[test]
    fn concurrent_increments_sum(increments in arb_vec(arb_vec(0u64..1_000, 0..64), 1..8)) {
        let counter = Counter::new();
        let expected: u64 = increments.iter().flatten().sum();

        let handles: Vec<_> = increments
            .into_iter()
            .map(|batch| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for value in batch {
                        counter.increment_by(value);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread panicked");
        }

        prop_assert_eq!(counter.value(), expected);
    }

    #[test]
    fn probe_stats_applied_exactly_once(calls in arb_vec(arb_probe_stats(), 0..32)) {
        let metrics = tablet_metrics("tablet-prop");
        let before = metrics.snapshot();

        let mut total = ProbeStats::default();
        for stats in &calls {
            metrics.add_probe_stats(stats);
            total += *stats;
        }

        let after = metrics.snapshot();
        let delta = |name| after.counter(name).unwrap_or(0) - before.counter(name).unwrap_or(0);
        prop_assert_eq!(delta(BLOOMS_CONSULTED), total.blooms_consulted);
        prop_assert_eq!(delta(KEYS_CONSULTED), total.keys_consulted);
        prop_assert_eq!(delta(DELTAS_CONSULTED), total.deltas_consulted);
        prop_assert_eq!(delta(MRS_CONSULTED), total.mrs_consulted);

        let count = |name| after.histogram(name).map(|h| h.count()).unwrap_or(0);
        prop_assert_eq!(count(BLOOMS_CONSULTED_PER_OP), calls.len() as u64);
        prop_assert_eq!(count(KEYS_CONSULTED_PER_OP), calls.len() as u64);
        prop_assert_eq!(count(DELTAS_CONSULTED_PER_OP), calls.len() as u64);

        let sum = |name| after.histogram(name).map(|h| h.sum()).unwrap_or(0);
        prop_assert_eq!(sum(BLOOMS_CONSULTED_PER_OP), total.blooms_consulted);
        prop_assert_eq!(sum(KEYS_CONSULTED_PER_OP), total.keys_consulted);
        prop_assert_eq!(sum(DELTAS_CONSULTED_PER_OP), total.deltas_consulted);
    }
}

#[test]
fn concurrent_probe_stats_are_not_lost() {
    const THREADS: u64 = 8;
    const CALLS: u64 = 500;

    let metrics = Arc::new(tablet_metrics("tablet-concurrent"));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let metrics = Arc::clone(&metrics);
            thread::spawn(move || {
                for _ in 0..CALLS {
                    metrics.add_probe_stats(&ProbeStats::new(1, i % 3, 2, 1));
                    metrics.record_scan_started();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("reader thread panicked");
    }

    let snapshot = metrics.snapshot();
    let calls = THREADS * CALLS;
    let keys: u64 = (0..THREADS).map(|i| (i % 3) * CALLS).sum();

    assert_eq!(snapshot.counter(SCANS_STARTED), Some(calls));
    assert_eq!(snapshot.counter(BLOOMS_CONSULTED), Some(calls));
    assert_eq!(snapshot.counter(KEYS_CONSULTED), Some(keys));
    assert_eq!(snapshot.counter(DELTAS_CONSULTED), Some(2 * calls));
    assert_eq!(snapshot.counter(MRS_CONSULTED), Some(calls));

    for name in [BLOOMS_CONSULTED_PER_OP, KEYS_CONSULTED_PER_OP, DELTAS_CONSULTED_PER_OP] {
        assert_eq!(snapshot.histogram(name).map(|h| h.count()), Some(calls), "{}", name);
    }
    let deltas = snapshot.histogram(DELTAS_CONSULTED_PER_OP).expect("histogram");
    assert_eq!(deltas.count_at(2), calls);
}
