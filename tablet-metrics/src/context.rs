use std::{collections::BTreeMap, fmt, sync::Arc};

use indexmap::{map::Entry, IndexMap};
use parking_lot::RwLock;
use quanta::Clock;
use tracing::trace;

use crate::{
    ConfigurationError, Counter, DescriptorRegistry, EntitySnapshot, Gauge, Histogram,
    MetricDescriptor, MetricKind, MetricSnapshot, MetricValue,
};

/// A metric bound to a context.
#[derive(Clone, Debug)]
pub enum MetricInstance {
    /// Counter.
    Counter(Counter),
    /// Gauge.
    Gauge(Gauge),
    /// Histogram.
    Histogram(Histogram),
}

impl MetricInstance {
    fn from_descriptor(descriptor: &MetricDescriptor) -> Result<Self, ConfigurationError> {
        match (descriptor.kind(), descriptor.histogram_bounds()) {
            (MetricKind::Counter, _) => Ok(MetricInstance::Counter(Counter::new())),
            (MetricKind::Gauge, _) => Ok(MetricInstance::Gauge(Gauge::new())),
            (MetricKind::Histogram, Some(bounds)) => {
                Histogram::new(descriptor.name(), descriptor.unit(), bounds)
                    .map(MetricInstance::Histogram)
            }
            (MetricKind::Histogram, None) => Err(ConfigurationError::InvalidHistogramBounds {
                name: descriptor.name().to_string(),
                reason: "histogram descriptor has no bounds".to_string(),
            }),
        }
    }

    /// Kind of this metric.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricInstance::Counter(_) => MetricKind::Counter,
            MetricInstance::Gauge(_) => MetricKind::Gauge,
            MetricInstance::Histogram(_) => MetricKind::Histogram,
        }
    }

    /// Reads the current value of this metric.
    pub fn value(&self) -> MetricValue {
        match self {
            MetricInstance::Counter(c) => MetricValue::Counter(c.value()),
            MetricInstance::Gauge(g) => MetricValue::Gauge(g.value()),
            MetricInstance::Histogram(h) => MetricValue::Histogram(h.snapshot()),
        }
    }
}

/// The metrics namespace of a single entity.
///
/// A context is the only way for a descriptor to become a live metric: each descriptor can be
/// instantiated at most once per context, and every instance is visible to anything enumerating
/// the context.  Contexts are obtained from a [`MetricRegistry`](crate::MetricRegistry), and
/// disappear from it once the last reference to them is dropped.
pub struct MetricContext {
    entity_type: &'static str,
    entity_id: String,
    descriptors: Arc<DescriptorRegistry>,
    clock: Clock,
    attributes: RwLock<BTreeMap<String, String>>,
    instances: RwLock<IndexMap<&'static str, (Arc<MetricDescriptor>, MetricInstance)>>,
}

impl MetricContext {
    pub(crate) fn new(
        entity_type: &'static str,
        entity_id: String,
        descriptors: Arc<DescriptorRegistry>,
        clock: Clock,
    ) -> Self {
        Self {
            entity_type,
            entity_id,
            descriptors,
            clock,
            attributes: RwLock::new(BTreeMap::new()),
            instances: RwLock::new(IndexMap::new()),
        }
    }

    /// Type of the entity owning this context.
    pub fn entity_type(&self) -> &'static str {
        self.entity_type
    }

    /// Identifier of the entity owning this context.
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Descriptors that can be instantiated in this context.
    pub fn descriptors(&self) -> &Arc<DescriptorRegistry> {
        &self.descriptors
    }

    /// Clock used to time operations on behalf of this entity.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Sets an attribute on the entity, replacing any previous value.
    pub fn set_attribute<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let _ = self.attributes.write().insert(key.into(), value.into());
    }

    /// Gets a copy of the entity's attributes.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.attributes.read().clone()
    }

    /// Instantiates the given descriptor in this context.
    ///
    /// # Errors
    ///
    /// If the descriptor does not belong to this context's descriptor registry, or was already
    /// instantiated in this context, an error is returned and existing instances are untouched.
    pub fn instantiate(
        &self,
        descriptor: &Arc<MetricDescriptor>,
    ) -> Result<MetricInstance, ConfigurationError> {
        if !self.descriptors.contains(descriptor) {
            return Err(ConfigurationError::MissingDescriptor {
                name: descriptor.name().to_string(),
            });
        }

        let mut instances = self.instances.write();
        match instances.entry(descriptor.name()) {
            Entry::Occupied(_) => Err(ConfigurationError::DuplicateInstance {
                entity: self.entity_id.clone(),
                name: descriptor.name().to_string(),
            }),
            Entry::Vacant(entry) => {
                let instance = MetricInstance::from_descriptor(descriptor)?;
                let _ = entry.insert((Arc::clone(descriptor), instance.clone()));
                trace!(entity = %self.entity_id, metric = descriptor.name(), "instantiated metric");
                Ok(instance)
            }
        }
    }

    /// Instantiates the counter with the given name.
    ///
    /// # Errors
    ///
    /// If no such descriptor exists, it is not a counter, or it was already instantiated in this
    /// context, an error is returned.
    pub fn counter(&self, name: &str) -> Result<Counter, ConfigurationError> {
        match self.instantiate_kind(name, MetricKind::Counter)? {
            MetricInstance::Counter(counter) => Ok(counter),
            other => Err(kind_mismatch(name, MetricKind::Counter, other.kind())),
        }
    }

    /// Instantiates the gauge with the given name.
    ///
    /// # Errors
    ///
    /// If no such descriptor exists, it is not a gauge, or it was already instantiated in this
    /// context, an error is returned.
    pub fn gauge(&self, name: &str) -> Result<Gauge, ConfigurationError> {
        match self.instantiate_kind(name, MetricKind::Gauge)? {
            MetricInstance::Gauge(gauge) => Ok(gauge),
            other => Err(kind_mismatch(name, MetricKind::Gauge, other.kind())),
        }
    }

    /// Instantiates the histogram with the given name.
    ///
    /// # Errors
    ///
    /// If no such descriptor exists, it is not a histogram, or it was already instantiated in
    /// this context, an error is returned.
    pub fn histogram(&self, name: &str) -> Result<Histogram, ConfigurationError> {
        match self.instantiate_kind(name, MetricKind::Histogram)? {
            MetricInstance::Histogram(histogram) => Ok(histogram),
            other => Err(kind_mismatch(name, MetricKind::Histogram, other.kind())),
        }
    }

    fn instantiate_kind(
        &self,
        name: &str,
        expected: MetricKind,
    ) -> Result<MetricInstance, ConfigurationError> {
        let descriptor = self.descriptors.lookup(name)?;
        if descriptor.kind() != expected {
            return Err(kind_mismatch(name, expected, descriptor.kind()));
        }
        self.instantiate(descriptor)
    }

    /// Gets the instance bound to the given name, if any.
    pub fn get(&self, name: &str) -> Option<MetricInstance> {
        self.instances.read().get(name).map(|(_, instance)| instance.clone())
    }

    /// Number of metrics bound to this context.
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Whether or not any metric is bound to this context.
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Unbinds the given metric, returning `true` if it was bound.
    pub(crate) fn remove(&self, name: &str) -> bool {
        self.instances.write().shift_remove(name).is_some()
    }

    /// Takes a point-in-time snapshot of every metric bound to this context.
    ///
    /// Values are read one at a time while writers keep going, so the snapshot is not a
    /// consistent cut across metrics.
    pub fn snapshot(&self) -> EntitySnapshot {
        let metrics = self
            .instances
            .read()
            .values()
            .map(|(descriptor, instance)| MetricSnapshot {
                descriptor: Arc::clone(descriptor),
                value: instance.value(),
            })
            .collect();

        EntitySnapshot {
            entity_type: self.entity_type,
            entity_id: self.entity_id.clone(),
            attributes: self.attributes(),
            metrics,
        }
    }
}

fn kind_mismatch(name: &str, expected: MetricKind, actual: MetricKind) -> ConfigurationError {
    ConfigurationError::KindMismatch { name: name.to_string(), expected, actual }
}

impl fmt::Debug for MetricContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricContext")
            .field("entity_type", &self.entity_type)
            .field("entity_id", &self.entity_id)
            .field("metrics", &self.len())
            .finish_non_exhaustive()
    }
}
