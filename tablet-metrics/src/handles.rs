//! Metric handles.
//!
//! Handles are cheap to clone: every clone shares the same underlying storage, so a handle can be
//! given to whichever part of the tablet emits the event while the owning [`MetricContext`]
//! retains its own copy for enumeration.
//!
//! [`MetricContext`]: crate::MetricContext
use std::{
    fmt,
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use parking_lot::Mutex;

use crate::{atomics::AtomicU64, ConfigurationError, HistogramBounds, Unit};

/// Quantiles exported alongside every histogram snapshot.
pub const DEFAULT_QUANTILES: &[f64] = &[0.75, 0.95, 0.99, 0.999, 0.9999];

/// A monotonically increasing counter.
#[derive(Clone, Default)]
pub struct Counter {
    inner: Arc<AtomicU64>,
}

impl Counter {
    /// Creates a new `Counter` starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter by one.
    pub fn increment(&self) {
        self.increment_by(1);
    }

    /// Increments the counter by the given amount.
    pub fn increment_by(&self, value: u64) {
        let _ = self.inner.fetch_add(value, Ordering::Release);
    }

    /// Gets the current value of the counter.
    pub fn value(&self) -> u64 {
        self.inner.load(Ordering::Acquire)
    }

    /// Whether or not both handles refer to the same counter.
    pub fn ptr_eq(&self, other: &Counter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Counter").field(&self.value()).finish()
    }
}

/// A gauge that tracks a non-negative level, such as how many operations are currently running.
#[derive(Clone, Default)]
pub struct Gauge {
    inner: Arc<AtomicU64>,
}

impl Gauge {
    /// Creates a new `Gauge` starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the gauge by the given amount.
    pub fn increment(&self, value: u64) {
        let _ = self.inner.fetch_add(value, Ordering::AcqRel);
    }

    /// Decrements the gauge by the given amount.
    ///
    /// The gauge saturates at zero rather than wrapping around.
    pub fn decrement(&self, value: u64) {
        let _ = self.inner.fetch_update(Ordering::AcqRel, Ordering::Relaxed, |curr| {
            Some(curr.saturating_sub(value))
        });
    }

    /// Sets the gauge to the given value.
    pub fn set(&self, value: u64) {
        self.inner.store(value, Ordering::Release);
    }

    /// Gets the current value of the gauge.
    pub fn value(&self) -> u64 {
        self.inner.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Gauge").field(&self.value()).finish()
    }
}

struct Buckets {
    hdr: hdrhistogram::Histogram<u64>,
    sum: u64,
}

struct HistogramInner {
    unit: Unit,
    buckets: Mutex<Buckets>,
}

/// A histogram with a fixed bucket layout.
///
/// The layout is derived once from the descriptor's [`HistogramBounds`]: values are tracked from 1
/// up to `max_value` while keeping `precision` significant decimal digits.  Values larger than
/// `max_value` are clamped to it, so recording never fails.
#[derive(Clone)]
pub struct Histogram {
    inner: Arc<HistogramInner>,
}

impl Histogram {
    /// Creates a new `Histogram` with the given bounds.
    ///
    /// # Errors
    ///
    /// If the bounds cannot produce a valid bucket layout, an error is returned.
    pub fn new(name: &str, unit: Unit, bounds: HistogramBounds) -> Result<Self, ConfigurationError> {
        let hdr = hdrhistogram::Histogram::<u64>::new_with_max(
            bounds.max_value(),
            bounds.precision(),
        )
        .map_err(|e| ConfigurationError::InvalidHistogramBounds {
            name: name.to_string(),
            reason: format!("{:?}", e),
        })?;

        Ok(Self {
            inner: Arc::new(HistogramInner { unit, buckets: Mutex::new(Buckets { hdr, sum: 0 }) }),
        })
    }

    /// Records a single value.
    pub fn record(&self, value: u64) {
        let mut buckets = self.inner.buckets.lock();
        let clamped = value.min(buckets.hdr.high());
        buckets.hdr.saturating_record(clamped);
        buckets.sum = buckets.sum.saturating_add(clamped);
    }

    /// Records a duration, converted to the unit of this histogram.
    ///
    /// Histograms that are not time-based record the duration in microseconds.
    pub fn record_duration(&self, duration: Duration) {
        let value = match self.inner.unit {
            Unit::Seconds => duration.as_secs(),
            Unit::Milliseconds => saturating_u64(duration.as_millis()),
            _ => saturating_u64(duration.as_micros()),
        };
        self.record(value);
    }

    /// Gets the unit values are recorded in.
    pub fn unit(&self) -> Unit {
        self.inner.unit
    }

    /// Takes a point-in-time snapshot of the histogram.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let buckets = self.inner.buckets.lock();
        HistogramSnapshot { hdr: buckets.hdr.clone(), sum: buckets.sum }
    }

    /// Whether or not both handles refer to the same histogram.
    pub fn ptr_eq(&self, other: &Histogram) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("unit", &self.inner.unit)
            .field("count", &self.snapshot().count())
            .finish()
    }
}

fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// A point-in-time copy of a histogram.
#[derive(Clone, Debug)]
pub struct HistogramSnapshot {
    hdr: hdrhistogram::Histogram<u64>,
    sum: u64,
}

impl HistogramSnapshot {
    /// Total number of recorded values.
    pub fn count(&self) -> u64 {
        self.hdr.len()
    }

    /// Whether or not any values were recorded.
    pub fn is_empty(&self) -> bool {
        self.hdr.is_empty()
    }

    /// Sum of all recorded values, after clamping.
    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Lowest recorded value, or zero if the histogram is empty.
    pub fn min(&self) -> u64 {
        if self.hdr.is_empty() {
            0
        } else {
            self.hdr.min()
        }
    }

    /// Highest recorded value, or zero if the histogram is empty.
    pub fn max(&self) -> u64 {
        if self.hdr.is_empty() {
            0
        } else {
            self.hdr.max()
        }
    }

    /// Mean of the recorded values.
    pub fn mean(&self) -> f64 {
        self.hdr.mean()
    }

    /// Value at the given quantile, in the range `[0.0, 1.0]`.
    pub fn value_at_quantile(&self, quantile: f64) -> u64 {
        self.hdr.value_at_quantile(quantile)
    }

    /// Number of recorded values that are equivalent to `value` within the histogram's precision.
    pub fn count_at(&self, value: u64) -> u64 {
        self.hdr.count_at(value)
    }

    /// Highest value configured for this histogram.
    pub fn max_value(&self) -> u64 {
        self.hdr.high()
    }

    /// Values at each of the [`DEFAULT_QUANTILES`].
    pub fn percentiles(&self) -> Vec<(f64, u64)> {
        DEFAULT_QUANTILES.iter().map(|q| (*q, self.hdr.value_at_quantile(*q))).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Counter, Gauge, Histogram};
    use crate::{ConfigurationError, HistogramBounds, Unit};

    #[test]
    fn counter_increment() {
        let counter = Counter::new();
        assert_eq!(counter.value(), 0);

        counter.increment();
        counter.increment_by(41);
        assert_eq!(counter.value(), 42);

        let shared = counter.clone();
        shared.increment_by(8);
        assert_eq!(counter.value(), 50);
        assert!(counter.ptr_eq(&shared));
        assert!(!counter.ptr_eq(&Counter::new()));
    }

    #[test]
    fn gauge_up_and_down() {
        let gauge = Gauge::new();
        gauge.increment(2);
        assert_eq!(gauge.value(), 2);

        gauge.decrement(1);
        assert_eq!(gauge.value(), 1);

        gauge.decrement(5);
        assert_eq!(gauge.value(), 0);

        gauge.set(7);
        assert_eq!(gauge.value(), 7);
    }

    #[test]
    fn histogram_records_and_clamps() {
        let histogram = Histogram::new("probes", Unit::Probes, HistogramBounds::new(20, 2))
            .expect("bounds should be valid");
        assert!(histogram.snapshot().is_empty());

        histogram.record(0);
        histogram.record(3);
        histogram.record(3);
        histogram.record(500);

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count(), 4);
        assert_eq!(snapshot.count_at(0), 1);
        assert_eq!(snapshot.count_at(3), 2);
        assert_eq!(snapshot.count_at(20), 1);
        assert_eq!(snapshot.min(), 0);
        assert_eq!(snapshot.max(), 20);
        assert_eq!(snapshot.sum(), 26);
        assert_eq!(snapshot.max_value(), 20);
    }

    #[test]
    fn histogram_snapshot_is_detached() {
        let histogram = Histogram::new("probes", Unit::Probes, HistogramBounds::new(20, 2))
            .expect("bounds should be valid");
        histogram.record(1);

        let before = histogram.snapshot();
        histogram.record(2);

        assert_eq!(before.count(), 1);
        assert_eq!(histogram.snapshot().count(), 2);
    }

    #[test]
    fn histogram_converts_durations() {
        let bounds = HistogramBounds::new(60_000_000, 2);

        let micros = Histogram::new("micros", Unit::Microseconds, bounds).expect("valid");
        micros.record_duration(Duration::from_millis(10));
        assert_eq!(micros.snapshot().count_at(10_000), 1);

        let secs = Histogram::new("secs", Unit::Seconds, bounds).expect("valid");
        secs.record_duration(Duration::from_millis(3_400));
        assert_eq!(secs.snapshot().count_at(3), 1);
        assert_eq!(secs.snapshot().sum(), 3);
    }

    #[test]
    fn histogram_rejects_invalid_bounds() {
        let result = Histogram::new("bad", Unit::Probes, HistogramBounds::new(20, 9));
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidHistogramBounds { ref name, .. }) if name == "bad"
        ));
    }

    #[test]
    fn empty_histogram_snapshot() {
        let histogram = Histogram::new("empty", Unit::Microseconds, HistogramBounds::new(1_000, 2))
            .expect("valid");
        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count(), 0);
        assert_eq!(snapshot.min(), 0);
        assert_eq!(snapshot.max(), 0);
        assert_eq!(snapshot.sum(), 0);
        assert_eq!(snapshot.percentiles().len(), 5);
    }
}
