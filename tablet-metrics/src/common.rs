use std::fmt;

/// Metric kind.
///
/// Defines the kind, or type, of a metric:
/// - counters
/// - gauges
/// - histograms
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum MetricKind {
    /// Counter type.
    Counter,
    /// Gauge type.
    Gauge,
    /// Histogram type.
    Histogram,
}

impl MetricKind {
    /// Gets the string form of this `MetricKind`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Units for a given metric.
///
/// Units are part of a metric's descriptor and travel with every snapshot, so that whatever ends
/// up exporting the value can label it properly.  Histograms that observe durations also use the
/// unit to decide how a [`Duration`](std::time::Duration) is converted before being recorded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Unit {
    /// Count.
    Count,
    /// Rows.
    Rows,
    /// Requests.
    Requests,
    /// Probes against a lookup structure.
    Probes,
    /// Bytes.
    Bytes,
    /// Seconds.
    ///
    /// One second is equal to 1000 milliseconds.
    Seconds,
    /// Milliseconds.
    ///
    /// One millisecond is equal to 1000 microseconds.
    Milliseconds,
    /// Microseconds.
    Microseconds,
    /// Background maintenance operations.
    MaintenanceOperations,
}

impl Unit {
    /// Gets the string form of this `Unit`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Count => "count",
            Unit::Rows => "rows",
            Unit::Requests => "requests",
            Unit::Probes => "probes",
            Unit::Bytes => "bytes",
            Unit::Seconds => "seconds",
            Unit::Milliseconds => "milliseconds",
            Unit::Microseconds => "microseconds",
            Unit::MaintenanceOperations => "operations",
        }
    }

    /// Gets the canonical string label for the given unit.
    ///
    /// Not all units have a meaningful display label and so some may be empty.
    pub fn as_canonical_label(&self) -> &'static str {
        match self {
            Unit::Count => "",
            Unit::Rows => "rows",
            Unit::Requests => "req",
            Unit::Probes => "probes",
            Unit::Bytes => "B",
            Unit::Seconds => "s",
            Unit::Milliseconds => "ms",
            Unit::Microseconds => "μs",
            Unit::MaintenanceOperations => "ops",
        }
    }

    /// Converts the string representation of a unit back into `Unit` if possible.
    ///
    /// The value passed here should match the output of [`Unit::as_str`].
    pub fn from_string(s: &str) -> Option<Unit> {
        match s {
            "count" => Some(Unit::Count),
            "rows" => Some(Unit::Rows),
            "requests" => Some(Unit::Requests),
            "probes" => Some(Unit::Probes),
            "bytes" => Some(Unit::Bytes),
            "seconds" => Some(Unit::Seconds),
            "milliseconds" => Some(Unit::Milliseconds),
            "microseconds" => Some(Unit::Microseconds),
            "operations" => Some(Unit::MaintenanceOperations),
            _ => None,
        }
    }

    /// Whether or not this unit relates to the measurement of time.
    pub fn is_time_based(&self) -> bool {
        matches!(self, Unit::Seconds | Unit::Milliseconds | Unit::Microseconds)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
