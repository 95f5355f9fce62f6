//! Metric descriptors and the registry that holds them.
//!
//! Descriptors are declared once, up front, through a [`DescriptorRegistryBuilder`].  Once built,
//! a [`DescriptorRegistry`] is immutable and can be shared freely between every context that
//! instantiates metrics from it.
use std::{fmt, sync::Arc};

use indexmap::{map::Entry, IndexMap};

use crate::{ConfigurationError, Histogram, MetricKind, Unit};

/// Bucket parameters for a histogram.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HistogramBounds {
    max_value: u64,
    precision: u8,
}

impl HistogramBounds {
    /// Creates a new `HistogramBounds`.
    ///
    /// `max_value` is the highest value the histogram can represent, and `precision` is the number
    /// of significant decimal digits kept for every recorded value.
    pub const fn new(max_value: u64, precision: u8) -> Self {
        Self { max_value, precision }
    }

    /// Highest representable value.
    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    /// Number of significant decimal digits.
    pub fn precision(&self) -> u8 {
        self.precision
    }
}

/// An immutable metric definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricDescriptor {
    name: &'static str,
    unit: Unit,
    description: &'static str,
    kind: MetricKind,
    bounds: Option<HistogramBounds>,
}

impl MetricDescriptor {
    /// Name of the metric.  Unique within its registry.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Unit of the metric.
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Human-readable description of the metric.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Kind of the metric.
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Bucket parameters, if the metric is a histogram.
    pub fn histogram_bounds(&self) -> Option<HistogramBounds> {
        self.bounds
    }
}

impl fmt::Display for MetricDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.name, self.unit)
    }
}

/// Builder for a [`DescriptorRegistry`].
#[derive(Debug, Default)]
pub struct DescriptorRegistryBuilder {
    descriptors: IndexMap<&'static str, Arc<MetricDescriptor>>,
}

impl DescriptorRegistryBuilder {
    /// Creates a new, empty `DescriptorRegistryBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a counter.
    ///
    /// # Errors
    ///
    /// If a metric with the same name was already defined, an error is returned.
    pub fn define_counter(
        &mut self,
        name: &'static str,
        unit: Unit,
        description: &'static str,
    ) -> Result<Arc<MetricDescriptor>, ConfigurationError> {
        self.define(MetricDescriptor { name, unit, description, kind: MetricKind::Counter, bounds: None })
    }

    /// Defines a gauge.
    ///
    /// # Errors
    ///
    /// If a metric with the same name was already defined, an error is returned.
    pub fn define_gauge(
        &mut self,
        name: &'static str,
        unit: Unit,
        description: &'static str,
    ) -> Result<Arc<MetricDescriptor>, ConfigurationError> {
        self.define(MetricDescriptor { name, unit, description, kind: MetricKind::Gauge, bounds: None })
    }

    /// Defines a histogram.
    ///
    /// # Errors
    ///
    /// If a metric with the same name was already defined, or the bounds cannot produce a valid
    /// bucket layout, an error is returned.
    pub fn define_histogram(
        &mut self,
        name: &'static str,
        unit: Unit,
        description: &'static str,
        bounds: HistogramBounds,
    ) -> Result<Arc<MetricDescriptor>, ConfigurationError> {
        // Build a throwaway histogram so that bad bounds surface now rather than at instantiation.
        let _ = Histogram::new(name, unit, bounds)?;

        self.define(MetricDescriptor {
            name,
            unit,
            description,
            kind: MetricKind::Histogram,
            bounds: Some(bounds),
        })
    }

    fn define(
        &mut self,
        descriptor: MetricDescriptor,
    ) -> Result<Arc<MetricDescriptor>, ConfigurationError> {
        match self.descriptors.entry(descriptor.name) {
            Entry::Occupied(_) => {
                Err(ConfigurationError::DuplicateDescriptor { name: descriptor.name.to_string() })
            }
            Entry::Vacant(entry) => Ok(entry.insert(Arc::new(descriptor)).clone()),
        }
    }

    /// Builds the registry.
    pub fn build(self) -> DescriptorRegistry {
        DescriptorRegistry { descriptors: self.descriptors }
    }
}

/// An immutable catalog of metric descriptors.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    descriptors: IndexMap<&'static str, Arc<MetricDescriptor>>,
}

impl DescriptorRegistry {
    /// Creates a new [`DescriptorRegistryBuilder`].
    pub fn builder() -> DescriptorRegistryBuilder {
        DescriptorRegistryBuilder::new()
    }

    /// Gets the descriptor with the given name.
    pub fn get(&self, name: &str) -> Option<&Arc<MetricDescriptor>> {
        self.descriptors.get(name)
    }

    /// Gets the descriptor with the given name, or an error if it is not defined.
    pub fn lookup(&self, name: &str) -> Result<&Arc<MetricDescriptor>, ConfigurationError> {
        self.get(name).ok_or_else(|| ConfigurationError::MissingDescriptor { name: name.to_string() })
    }

    /// Whether or not this exact descriptor belongs to the registry.
    pub fn contains(&self, descriptor: &Arc<MetricDescriptor>) -> bool {
        self.get(descriptor.name()).map_or(false, |d| Arc::ptr_eq(d, descriptor))
    }

    /// Iterates over every descriptor, in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MetricDescriptor>> {
        self.descriptors.values()
    }

    /// Number of defined descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether or not the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
