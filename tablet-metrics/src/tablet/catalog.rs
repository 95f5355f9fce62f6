//! Tablet metric definitions.
use crate::{ConfigurationError, DescriptorRegistryBuilder, HistogramBounds, Unit};

/// Number of rows inserted.
pub const ROWS_INSERTED: &str = "rows_inserted";
/// Number of row updates.
pub const ROWS_UPDATED: &str = "rows_updated";
/// Number of row deletes.
pub const ROWS_DELETED: &str = "rows_deleted";
/// Number of inserts rejected because the key already existed.
pub const INSERTIONS_FAILED_DUP_KEY: &str = "insertions_failed_dup_key";
/// Number of scanners started.
pub const SCANS_STARTED: &str = "scans_started";

/// Number of bloom filter probes.
pub const BLOOMS_CONSULTED: &str = "blooms_consulted";
/// Number of key index probes.
pub const KEYS_CONSULTED: &str = "keys_consulted";
/// Number of delta file probes.
pub const DELTAS_CONSULTED: &str = "deltas_consulted";
/// Number of in-memory row store probes.
pub const MRS_CONSULTED: &str = "mrs_consulted";
/// Number of bytes flushed to disk.
pub const BYTES_FLUSHED: &str = "bytes_flushed";

/// Bloom filter probes per operation.
pub const BLOOMS_CONSULTED_PER_OP: &str = "blooms_consulted_per_op";
/// Key index probes per operation.
pub const KEYS_CONSULTED_PER_OP: &str = "keys_consulted_per_op";
/// Delta file probes per operation.
pub const DELTAS_CONSULTED_PER_OP: &str = "deltas_consulted_per_op";

/// Write duration with no external consistency.
pub const WRITE_OP_DURATION_NO_CONSISTENCY: &str = "write_op_duration_no_consistency";
/// Write duration with client-propagated external consistency.
pub const WRITE_OP_DURATION_CLIENT_PROPAGATED_CONSISTENCY: &str =
    "write_op_duration_client_propagated_consistency";
/// Write duration with commit-wait external consistency.
pub const WRITE_OP_DURATION_COMMIT_WAIT_CONSISTENCY: &str =
    "write_op_duration_commit_wait_consistency";
/// Time spent in commit wait.
pub const COMMIT_WAIT_DURATION: &str = "commit_wait_duration";
/// Time snapshot scans spent waiting on in-flight writes.
pub const SNAPSHOT_SCAN_INFLIGHT_WAIT_DURATION: &str = "snapshot_scan_inflight_wait_duration";

/// Delta store flushes currently running.
pub const FLUSH_DMS_RUNNING: &str = "flush_dms_running";
/// In-memory row store flushes currently running.
pub const FLUSH_MRS_RUNNING: &str = "flush_mrs_running";
/// Row set compactions currently running.
pub const COMPACT_RS_RUNNING: &str = "compact_rs_running";

/// Delta store flush duration.
pub const FLUSH_DMS_DURATION: &str = "flush_dms_duration";
/// In-memory row store flush duration.
pub const FLUSH_MRS_DURATION: &str = "flush_mrs_duration";
/// Row set compaction duration.
pub const COMPACT_RS_DURATION: &str = "compact_rs_duration";

const PROBES_PER_OP: HistogramBounds = HistogramBounds::new(20, 2);
const DURATION_BOUNDS: HistogramBounds = HistogramBounds::new(60_000_000, 2);

/// Registers every tablet metric description.
///
/// # Errors
///
/// If any of the tablet metrics is already defined in `builder`, an error is returned.
pub fn register_descriptors(builder: &mut DescriptorRegistryBuilder) -> Result<(), ConfigurationError> {
    builder.define_counter(
        ROWS_INSERTED,
        Unit::Rows,
        "Number of rows inserted into this tablet since service start",
    )?;
    builder.define_counter(
        ROWS_UPDATED,
        Unit::Rows,
        "Number of row update operations performed on this tablet since service start",
    )?;
    builder.define_counter(
        ROWS_DELETED,
        Unit::Rows,
        "Number of row delete operations performed on this tablet since service start",
    )?;
    builder.define_counter(
        INSERTIONS_FAILED_DUP_KEY,
        Unit::Rows,
        "Number of inserts which failed because the key already existed",
    )?;
    builder.define_counter(
        SCANS_STARTED,
        Unit::Requests,
        "Number of scanners which have been started on this tablet",
    )?;

    builder.define_counter(
        BLOOMS_CONSULTED,
        Unit::Probes,
        "Number of times a bloom filter was consulted",
    )?;
    builder.define_counter(KEYS_CONSULTED, Unit::Probes, "Number of times a key index was consulted")?;
    builder.define_counter(
        DELTAS_CONSULTED,
        Unit::Probes,
        "Number of times a delta file was consulted",
    )?;
    builder.define_counter(
        MRS_CONSULTED,
        Unit::Probes,
        "Number of times the in-memory row store was consulted",
    )?;
    builder.define_counter(
        BYTES_FLUSHED,
        Unit::Bytes,
        "Number of bytes that have been flushed to disk by this tablet",
    )?;

    builder.define_histogram(
        BLOOMS_CONSULTED_PER_OP,
        Unit::Probes,
        "Number of times a bloom filter was consulted, per operation",
        PROBES_PER_OP,
    )?;
    builder.define_histogram(
        KEYS_CONSULTED_PER_OP,
        Unit::Probes,
        "Number of times a key index was consulted, per operation",
        PROBES_PER_OP,
    )?;
    builder.define_histogram(
        DELTAS_CONSULTED_PER_OP,
        Unit::Probes,
        "Number of times a delta file was consulted, per operation",
        PROBES_PER_OP,
    )?;

    builder.define_histogram(
        WRITE_OP_DURATION_NO_CONSISTENCY,
        Unit::Microseconds,
        "Duration of writes to this tablet with external consistency set to NO_CONSISTENCY",
        DURATION_BOUNDS,
    )?;
    builder.define_histogram(
        WRITE_OP_DURATION_CLIENT_PROPAGATED_CONSISTENCY,
        Unit::Microseconds,
        "Duration of writes to this tablet with external consistency set to CLIENT_PROPAGATED",
        DURATION_BOUNDS,
    )?;
    builder.define_histogram(
        WRITE_OP_DURATION_COMMIT_WAIT_CONSISTENCY,
        Unit::Microseconds,
        "Duration of writes to this tablet with external consistency set to COMMIT_WAIT",
        DURATION_BOUNDS,
    )?;
    builder.define_histogram(
        COMMIT_WAIT_DURATION,
        Unit::Microseconds,
        "Microseconds spent waiting for COMMIT_WAIT external consistency writes for this tablet",
        DURATION_BOUNDS,
    )?;
    builder.define_histogram(
        SNAPSHOT_SCAN_INFLIGHT_WAIT_DURATION,
        Unit::Microseconds,
        "Microseconds spent waiting for in-flight writes to complete for READ_AT_SNAPSHOT scans",
        DURATION_BOUNDS,
    )?;

    builder.define_gauge(
        FLUSH_DMS_RUNNING,
        Unit::MaintenanceOperations,
        "Number of delta store flushes currently running",
    )?;
    builder.define_gauge(
        FLUSH_MRS_RUNNING,
        Unit::MaintenanceOperations,
        "Number of in-memory row store flushes currently running",
    )?;
    builder.define_gauge(
        COMPACT_RS_RUNNING,
        Unit::MaintenanceOperations,
        "Number of row set compactions currently running",
    )?;

    // Same bounds as the write path, but recorded in whole seconds.
    builder.define_histogram(
        FLUSH_DMS_DURATION,
        Unit::Seconds,
        "Seconds spent flushing delta stores",
        DURATION_BOUNDS,
    )?;
    builder.define_histogram(
        FLUSH_MRS_DURATION,
        Unit::Seconds,
        "Seconds spent flushing the in-memory row store",
        DURATION_BOUNDS,
    )?;
    builder.define_histogram(
        COMPACT_RS_DURATION,
        Unit::Seconds,
        "Seconds spent compacting row sets",
        DURATION_BOUNDS,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DescriptorRegistry, MetricKind};

    #[test]
    fn catalog_is_complete() {
        let mut builder = DescriptorRegistry::builder();
        register_descriptors(&mut builder).expect("catalog should register");
        let registry = builder.build();
        assert_eq!(registry.len(), 24);

        let count = |kind| registry.iter().filter(|d| d.kind() == kind).count();
        assert_eq!(count(MetricKind::Counter), 10);
        assert_eq!(count(MetricKind::Gauge), 3);
        assert_eq!(count(MetricKind::Histogram), 11);

        let probes = registry.lookup(KEYS_CONSULTED_PER_OP).expect("defined");
        assert_eq!(probes.histogram_bounds().map(|b| b.max_value()), Some(20));

        let flush = registry.lookup(FLUSH_DMS_DURATION).expect("defined");
        assert_eq!(flush.unit(), Unit::Seconds);
    }

    #[test]
    fn catalog_registers_once() {
        let mut builder = DescriptorRegistry::builder();
        register_descriptors(&mut builder).expect("catalog should register");
        let err = register_descriptors(&mut builder).expect_err("second registration fails");
        assert_eq!(
            err,
            ConfigurationError::DuplicateDescriptor { name: ROWS_INSERTED.to_string() }
        );
    }
}
