//! Point-in-time views over bound metrics, as handed to exporters.
use std::{collections::BTreeMap, sync::Arc};

use crate::{HistogramSnapshot, MetricDescriptor, MetricKind};

/// A point-in-time value for a metric.
#[derive(Clone, Debug)]
pub enum MetricValue {
    /// Counter.
    Counter(u64),
    /// Gauge.
    Gauge(u64),
    /// Histogram.
    Histogram(HistogramSnapshot),
}

impl MetricValue {
    /// Kind of metric this value was read from.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Histogram(_) => MetricKind::Histogram,
        }
    }
}

/// The value of a single metric, along with its descriptor.
#[derive(Clone, Debug)]
pub struct MetricSnapshot {
    /// Descriptor the metric was instantiated from.
    pub descriptor: Arc<MetricDescriptor>,
    /// Value at the time of the snapshot.
    pub value: MetricValue,
}

impl MetricSnapshot {
    /// Name of the metric.
    pub fn name(&self) -> &'static str {
        self.descriptor.name()
    }
}

/// Every metric bound to one entity, in the order they were instantiated.
#[derive(Clone, Debug)]
pub struct EntitySnapshot {
    /// Type of the entity, such as `tablet`.
    pub entity_type: &'static str,
    /// Identifier of the entity.
    pub entity_id: String,
    /// Attributes attached to the entity.
    pub attributes: BTreeMap<String, String>,
    /// Metric values.
    pub metrics: Vec<MetricSnapshot>,
}

impl EntitySnapshot {
    /// Gets the snapshot of the metric with the given name.
    pub fn get(&self, name: &str) -> Option<&MetricSnapshot> {
        self.metrics.iter().find(|m| m.name() == name)
    }

    /// Gets the value of the counter with the given name.
    pub fn counter(&self, name: &str) -> Option<u64> {
        match self.get(name)?.value {
            MetricValue::Counter(value) => Some(value),
            _ => None,
        }
    }

    /// Gets the value of the gauge with the given name.
    pub fn gauge(&self, name: &str) -> Option<u64> {
        match self.get(name)?.value {
            MetricValue::Gauge(value) => Some(value),
            _ => None,
        }
    }

    /// Gets the snapshot of the histogram with the given name.
    pub fn histogram(&self, name: &str) -> Option<&HistogramSnapshot> {
        match &self.get(name)?.value {
            MetricValue::Histogram(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}
