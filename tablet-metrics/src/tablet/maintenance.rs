use std::{fmt, time::Duration};

use quanta::Instant;

use super::TabletMetrics;

/// Background maintenance operations tracked per tablet.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MaintenanceOp {
    /// Flushing a delta store to disk.
    FlushDeltaStore,
    /// Flushing the in-memory row store to disk.
    FlushMemRowStore,
    /// Compacting row sets.
    CompactRowSet,
}

impl MaintenanceOp {
    /// Gets the string form of this `MaintenanceOp`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceOp::FlushDeltaStore => "flush_dms",
            MaintenanceOp::FlushMemRowStore => "flush_mrs",
            MaintenanceOp::CompactRowSet => "compact_rs",
        }
    }
}

impl fmt::Display for MaintenanceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Times a running maintenance operation.
///
/// Created by [`TabletMetrics::start_maintenance_op`], which has already marked the operation as
/// running.  The operation is marked finished, and its duration recorded, when the timer is
/// finished explicitly or dropped.
#[must_use = "dropping the timer immediately finishes the operation"]
pub struct MaintenanceOpTimer<'a> {
    metrics: &'a TabletMetrics,
    op: MaintenanceOp,
    start: Instant,
    finished: bool,
}

impl<'a> MaintenanceOpTimer<'a> {
    pub(super) fn new(metrics: &'a TabletMetrics, op: MaintenanceOp, start: Instant) -> Self {
        Self { metrics, op, start, finished: false }
    }

    /// The operation being timed.
    pub fn op(&self) -> MaintenanceOp {
        self.op
    }

    /// Finishes the operation, returning how long it ran.
    pub fn finish(mut self) -> Duration {
        self.complete()
    }

    fn complete(&mut self) -> Duration {
        let elapsed = self.metrics.clock.now().saturating_duration_since(self.start);
        self.finished = true;
        self.metrics.maintenance_op_finished(self.op, elapsed);
        elapsed
    }
}

impl Drop for MaintenanceOpTimer<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.complete();
        }
    }
}

impl fmt::Debug for MaintenanceOpTimer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaintenanceOpTimer").field("op", &self.op).finish_non_exhaustive()
    }
}
