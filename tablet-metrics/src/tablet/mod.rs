//! Per-tablet metrics.
use std::{fmt, sync::Arc, time::Duration};

use quanta::Clock;
use tracing::{debug, trace, warn};

use crate::{ConfigurationError, Counter, EntitySnapshot, Gauge, Histogram, MetricContext};

pub mod catalog;
pub use self::catalog::register_descriptors;

mod maintenance;
pub use self::maintenance::{MaintenanceOp, MaintenanceOpTimer};

mod probe;
pub use self::probe::ProbeStats;

use self::catalog::*;

/// Entity type used for tablet contexts.
pub const ENTITY_TYPE: &str = "tablet";

/// External consistency mode requested by a write.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExternalConsistencyMode {
    /// No external consistency guarantee.
    NoConsistency,
    /// Consistency through a timestamp propagated by the client.
    ClientPropagated,
    /// Consistency by waiting for the commit timestamp to pass before acknowledging.
    CommitWait,
}

/// Tracks which metrics were bound during construction so they can be unbound on failure.
struct Binder<'a> {
    ctx: &'a MetricContext,
    bound: Vec<&'static str>,
}

impl<'a> Binder<'a> {
    fn new(ctx: &'a MetricContext) -> Self {
        Self { ctx, bound: Vec::new() }
    }

    fn counter(&mut self, name: &'static str) -> Result<Counter, ConfigurationError> {
        let counter = self.ctx.counter(name)?;
        self.bound.push(name);
        Ok(counter)
    }

    fn gauge(&mut self, name: &'static str) -> Result<Gauge, ConfigurationError> {
        let gauge = self.ctx.gauge(name)?;
        self.bound.push(name);
        Ok(gauge)
    }

    fn histogram(&mut self, name: &'static str) -> Result<Histogram, ConfigurationError> {
        let histogram = self.ctx.histogram(name)?;
        self.bound.push(name);
        Ok(histogram)
    }

    fn unwind(self) {
        for name in self.bound.into_iter().rev() {
            let _ = self.ctx.remove(name);
        }
    }
}

/// Metrics for a single tablet.
///
/// Holds one instance of every tablet metric, all bound to the tablet's [`MetricContext`].  Every
/// recording method is a direct update of an in-memory metric: none of them block on I/O, and
/// none of them can fail.
pub struct TabletMetrics {
    rows_inserted: Counter,
    rows_updated: Counter,
    rows_deleted: Counter,
    insertions_failed_dup_key: Counter,
    scans_started: Counter,

    blooms_consulted: Counter,
    keys_consulted: Counter,
    deltas_consulted: Counter,
    mrs_consulted: Counter,
    bytes_flushed: Counter,

    blooms_consulted_per_op: Histogram,
    keys_consulted_per_op: Histogram,
    deltas_consulted_per_op: Histogram,

    write_op_duration_no_consistency: Histogram,
    write_op_duration_client_propagated_consistency: Histogram,
    write_op_duration_commit_wait_consistency: Histogram,
    commit_wait_duration: Histogram,
    snapshot_scan_inflight_wait_duration: Histogram,

    flush_dms_running: Gauge,
    flush_mrs_running: Gauge,
    compact_rs_running: Gauge,

    flush_dms_duration: Histogram,
    flush_mrs_duration: Histogram,
    compact_rs_duration: Histogram,

    clock: Clock,
    ctx: Arc<MetricContext>,
}

impl TabletMetrics {
    /// Binds every tablet metric to the given context.
    ///
    /// # Errors
    ///
    /// If any metric cannot be instantiated, the metrics bound so far are removed from the context
    /// again and the error is returned.  The tablet must not be brought up in that case.
    pub fn new(ctx: &Arc<MetricContext>) -> Result<Self, ConfigurationError> {
        let mut binder = Binder::new(ctx);
        match Self::bind(&mut binder, ctx) {
            Ok(metrics) => {
                debug!(tablet = ctx.entity_id(), metrics = binder.bound.len(), "bound tablet metrics");
                Ok(metrics)
            }
            Err(e) => {
                warn!(tablet = ctx.entity_id(), error = %e, "failed to bind tablet metrics");
                binder.unwind();
                Err(e)
            }
        }
    }

    fn bind(binder: &mut Binder<'_>, ctx: &Arc<MetricContext>) -> Result<Self, ConfigurationError> {
        Ok(Self {
            rows_inserted: binder.counter(ROWS_INSERTED)?,
            rows_updated: binder.counter(ROWS_UPDATED)?,
            rows_deleted: binder.counter(ROWS_DELETED)?,
            insertions_failed_dup_key: binder.counter(INSERTIONS_FAILED_DUP_KEY)?,
            scans_started: binder.counter(SCANS_STARTED)?,

            blooms_consulted: binder.counter(BLOOMS_CONSULTED)?,
            keys_consulted: binder.counter(KEYS_CONSULTED)?,
            deltas_consulted: binder.counter(DELTAS_CONSULTED)?,
            mrs_consulted: binder.counter(MRS_CONSULTED)?,
            bytes_flushed: binder.counter(BYTES_FLUSHED)?,

            blooms_consulted_per_op: binder.histogram(BLOOMS_CONSULTED_PER_OP)?,
            keys_consulted_per_op: binder.histogram(KEYS_CONSULTED_PER_OP)?,
            deltas_consulted_per_op: binder.histogram(DELTAS_CONSULTED_PER_OP)?,

            write_op_duration_no_consistency: binder.histogram(WRITE_OP_DURATION_NO_CONSISTENCY)?,
            write_op_duration_client_propagated_consistency: binder
                .histogram(WRITE_OP_DURATION_CLIENT_PROPAGATED_CONSISTENCY)?,
            write_op_duration_commit_wait_consistency: binder
                .histogram(WRITE_OP_DURATION_COMMIT_WAIT_CONSISTENCY)?,
            commit_wait_duration: binder.histogram(COMMIT_WAIT_DURATION)?,
            snapshot_scan_inflight_wait_duration: binder
                .histogram(SNAPSHOT_SCAN_INFLIGHT_WAIT_DURATION)?,

            flush_dms_running: binder.gauge(FLUSH_DMS_RUNNING)?,
            flush_mrs_running: binder.gauge(FLUSH_MRS_RUNNING)?,
            compact_rs_running: binder.gauge(COMPACT_RS_RUNNING)?,

            flush_dms_duration: binder.histogram(FLUSH_DMS_DURATION)?,
            flush_mrs_duration: binder.histogram(FLUSH_MRS_DURATION)?,
            compact_rs_duration: binder.histogram(COMPACT_RS_DURATION)?,

            clock: ctx.clock().clone(),
            ctx: Arc::clone(ctx),
        })
    }

    /// The context these metrics are bound to.
    pub fn context(&self) -> &Arc<MetricContext> {
        &self.ctx
    }

    /// Takes a point-in-time snapshot of this tablet's metrics.
    pub fn snapshot(&self) -> EntitySnapshot {
        self.ctx.snapshot()
    }

    /// Records a row insert.
    pub fn record_insert(&self) {
        self.rows_inserted.increment();
    }

    /// Records a row update.
    pub fn record_update(&self) {
        self.rows_updated.increment();
    }

    /// Records a row delete.
    pub fn record_delete(&self) {
        self.rows_deleted.increment();
    }

    /// Records an insert rejected because its key already existed.
    pub fn record_duplicate_key_failure(&self) {
        self.insertions_failed_dup_key.increment();
    }

    /// Records a scanner being started.
    pub fn record_scan_started(&self) {
        self.scans_started.increment();
    }

    /// Records a completed flush of `bytes` bytes.
    pub fn record_bytes_flushed(&self, bytes: u64) {
        self.bytes_flushed.increment_by(bytes);
    }

    /// Folds the lookup counts of one read or scan operation into the tablet's metrics.
    ///
    /// Every count is added to its cumulative counter.  The bloom, key and delta counts are also
    /// recorded, once each, in their per-operation histograms.  The in-memory row store count has
    /// no per-operation histogram.
    pub fn add_probe_stats(&self, stats: &ProbeStats) {
        self.blooms_consulted.increment_by(stats.blooms_consulted);
        self.keys_consulted.increment_by(stats.keys_consulted);
        self.deltas_consulted.increment_by(stats.deltas_consulted);
        self.mrs_consulted.increment_by(stats.mrs_consulted);

        self.blooms_consulted_per_op.record(stats.blooms_consulted);
        self.keys_consulted_per_op.record(stats.keys_consulted);
        self.deltas_consulted_per_op.record(stats.deltas_consulted);
    }

    /// Records how long a write took, under the external consistency mode it requested.
    pub fn record_write_duration(&self, mode: ExternalConsistencyMode, duration: Duration) {
        let histogram = match mode {
            ExternalConsistencyMode::NoConsistency => &self.write_op_duration_no_consistency,
            ExternalConsistencyMode::ClientPropagated => {
                &self.write_op_duration_client_propagated_consistency
            }
            ExternalConsistencyMode::CommitWait => &self.write_op_duration_commit_wait_consistency,
        };
        histogram.record_duration(duration);
    }

    /// Records time spent in commit wait.
    pub fn record_commit_wait(&self, duration: Duration) {
        self.commit_wait_duration.record_duration(duration);
    }

    /// Records time a snapshot scan spent waiting for in-flight writes.
    pub fn record_snapshot_scan_wait(&self, duration: Duration) {
        self.snapshot_scan_inflight_wait_duration.record_duration(duration);
    }

    fn maintenance_metrics(&self, op: MaintenanceOp) -> (&Gauge, &Histogram) {
        match op {
            MaintenanceOp::FlushDeltaStore => (&self.flush_dms_running, &self.flush_dms_duration),
            MaintenanceOp::FlushMemRowStore => (&self.flush_mrs_running, &self.flush_mrs_duration),
            MaintenanceOp::CompactRowSet => (&self.compact_rs_running, &self.compact_rs_duration),
        }
    }

    /// Marks a maintenance operation as running.
    ///
    /// Must be paired with a call to [`maintenance_op_finished`](Self::maintenance_op_finished).
    pub fn maintenance_op_started(&self, op: MaintenanceOp) {
        let (running, _) = self.maintenance_metrics(op);
        running.increment(1);
        trace!(tablet = self.ctx.entity_id(), %op, "maintenance op started");
    }

    /// Marks a maintenance operation as finished after running for `elapsed`.
    pub fn maintenance_op_finished(&self, op: MaintenanceOp, elapsed: Duration) {
        let (running, duration) = self.maintenance_metrics(op);
        running.decrement(1);
        duration.record_duration(elapsed);
        trace!(tablet = self.ctx.entity_id(), %op, ?elapsed, "maintenance op finished");
    }

    /// Marks a maintenance operation as running and starts timing it.
    pub fn start_maintenance_op(&self, op: MaintenanceOp) -> MaintenanceOpTimer<'_> {
        self.maintenance_op_started(op);
        MaintenanceOpTimer::new(self, op, self.clock.now())
    }
}

impl fmt::Debug for TabletMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabletMetrics").field("tablet", &self.ctx.entity_id()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use quanta::Clock;

    use super::*;
    use crate::{DescriptorRegistry, MetricRegistry, Unit};

    fn registry_with_clock(clock: Clock) -> MetricRegistry {
        let mut builder = DescriptorRegistry::builder();
        register_descriptors(&mut builder).expect("catalog should register");
        MetricRegistry::builder().clock(clock).build(builder.build())
    }

    fn registry() -> MetricRegistry {
        registry_with_clock(Clock::new())
    }

    #[test]
    fn binds_every_descriptor() {
        let registry = registry();
        let ctx = registry.find_or_create_context(ENTITY_TYPE, "tablet-1");
        let metrics = TabletMetrics::new(&ctx).expect("should bind");

        assert_eq!(ctx.len(), registry.descriptors().len());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.metrics.len(), 24);
        assert!(Arc::ptr_eq(metrics.context(), &ctx));
    }

    #[test]
    fn probe_stats_fold_into_counters_and_histograms() {
        let registry = registry();
        let ctx = registry.find_or_create_context(ENTITY_TYPE, "tablet-1");
        let metrics = TabletMetrics::new(&ctx).expect("should bind");

        metrics.add_probe_stats(&ProbeStats::new(3, 5, 7, 11));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counter(BLOOMS_CONSULTED), Some(3));
        assert_eq!(snapshot.counter(KEYS_CONSULTED), Some(5));
        assert_eq!(snapshot.counter(DELTAS_CONSULTED), Some(7));
        assert_eq!(snapshot.counter(MRS_CONSULTED), Some(11));

        for (name, value) in
            [(BLOOMS_CONSULTED_PER_OP, 3), (KEYS_CONSULTED_PER_OP, 5), (DELTAS_CONSULTED_PER_OP, 7)]
        {
            let histogram = snapshot.histogram(name).expect("histogram");
            assert_eq!(histogram.count(), 1, "{}", name);
            assert_eq!(histogram.count_at(value), 1, "{}", name);
        }
    }

    #[test]
    fn zero_probe_stats_still_observe() {
        let registry = registry();
        let ctx = registry.find_or_create_context(ENTITY_TYPE, "tablet-1");
        let metrics = TabletMetrics::new(&ctx).expect("should bind");

        metrics.add_probe_stats(&ProbeStats::default());

        let snapshot = metrics.snapshot();
        for name in [BLOOMS_CONSULTED, KEYS_CONSULTED, DELTAS_CONSULTED, MRS_CONSULTED] {
            assert_eq!(snapshot.counter(name), Some(0), "{}", name);
        }
        for name in [BLOOMS_CONSULTED_PER_OP, KEYS_CONSULTED_PER_OP, DELTAS_CONSULTED_PER_OP] {
            let histogram = snapshot.histogram(name).expect("histogram");
            assert_eq!(histogram.count(), 1, "{}", name);
            assert_eq!(histogram.count_at(0), 1, "{}", name);
        }
    }

    #[test]
    fn write_durations_by_consistency_mode() {
        let registry = registry();
        let ctx = registry.find_or_create_context(ENTITY_TYPE, "tablet-1");
        let metrics = TabletMetrics::new(&ctx).expect("should bind");

        metrics.record_write_duration(ExternalConsistencyMode::ClientPropagated, Duration::from_micros(250));
        metrics.record_commit_wait(Duration::from_millis(2));
        metrics.record_snapshot_scan_wait(Duration::from_micros(40));

        let snapshot = metrics.snapshot();
        let count = |name| snapshot.histogram(name).map(|h| h.count());
        assert_eq!(count(WRITE_OP_DURATION_CLIENT_PROPAGATED_CONSISTENCY), Some(1));
        assert_eq!(count(WRITE_OP_DURATION_NO_CONSISTENCY), Some(0));
        assert_eq!(count(WRITE_OP_DURATION_COMMIT_WAIT_CONSISTENCY), Some(0));
        assert_eq!(snapshot.histogram(COMMIT_WAIT_DURATION).map(|h| h.count_at(2_000)), Some(1));
        assert_eq!(
            snapshot.histogram(SNAPSHOT_SCAN_INFLIGHT_WAIT_DURATION).map(|h| h.count_at(40)),
            Some(1)
        );
    }

    #[test]
    fn maintenance_timer_uses_context_clock() {
        let (clock, mock) = Clock::mock();
        let registry = registry_with_clock(clock);
        let ctx = registry.find_or_create_context(ENTITY_TYPE, "tablet-1");
        let metrics = TabletMetrics::new(&ctx).expect("should bind");

        let timer = metrics.start_maintenance_op(MaintenanceOp::CompactRowSet);
        assert_eq!(timer.op(), MaintenanceOp::CompactRowSet);
        assert_eq!(metrics.snapshot().gauge(COMPACT_RS_RUNNING), Some(1));

        mock.increment(Duration::from_secs(4));
        assert_eq!(timer.finish(), Duration::from_secs(4));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.gauge(COMPACT_RS_RUNNING), Some(0));
        assert_eq!(snapshot.histogram(COMPACT_RS_DURATION).map(|h| h.count_at(4)), Some(1));

        {
            let _timer = metrics.start_maintenance_op(MaintenanceOp::FlushMemRowStore);
            mock.increment(Duration::from_secs(2));
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.gauge(FLUSH_MRS_RUNNING), Some(0));
        assert_eq!(snapshot.histogram(FLUSH_MRS_DURATION).map(|h| h.count_at(2)), Some(1));
    }

    #[test]
    fn failed_binding_leaves_context_untouched() {
        let registry = registry();
        let ctx = registry.find_or_create_context(ENTITY_TYPE, "tablet-1");

        // Something already claimed one of the tablet metrics in this context.
        let existing = ctx.gauge(FLUSH_MRS_RUNNING).expect("should bind");
        existing.increment(3);

        let err = TabletMetrics::new(&ctx).expect_err("binding must fail");
        assert_eq!(
            err,
            ConfigurationError::DuplicateInstance {
                entity: "tablet-1".to_string(),
                name: FLUSH_MRS_RUNNING.to_string(),
            }
        );

        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.snapshot().gauge(FLUSH_MRS_RUNNING), Some(3));
    }

    #[test]
    fn missing_descriptor_fails_binding() {
        let mut builder = DescriptorRegistry::builder();
        let _ = builder.define_counter(ROWS_INSERTED, Unit::Rows, "").expect("ok");
        let registry = MetricRegistry::new(builder.build());
        let ctx = registry.find_or_create_context(ENTITY_TYPE, "tablet-1");

        let err = TabletMetrics::new(&ctx).expect_err("binding must fail");
        assert_eq!(err, ConfigurationError::MissingDescriptor { name: ROWS_UPDATED.to_string() });
        assert!(ctx.is_empty());
    }
}
