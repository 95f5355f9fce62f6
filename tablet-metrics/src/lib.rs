//! Per-tablet metrics for a storage engine.
//!
//! # Overview
//! Every tablet carries its own set of metrics describing write outcomes, read-path probe
//! activity, write latency by external consistency mode, and background maintenance activity.
//! This crate declares those metrics and binds one live instance of each to a tablet when it is
//! opened.
//!
//! ## Descriptors
//! A [`MetricDescriptor`] is the immutable definition of a metric: its name, unit, description,
//! kind and, for histograms, the [`HistogramBounds`] that fix its bucket layout.  Descriptors are
//! declared once at process start through a [`DescriptorRegistryBuilder`]; the resulting
//! [`DescriptorRegistry`] never changes afterwards.
//!
//! ## Contexts
//! A [`MetricContext`] is the metrics namespace of a single entity.  Instantiating a descriptor
//! against a context produces a [`Counter`], [`Gauge`] or [`Histogram`] that is visible to
//! anything enumerating that context.  Each descriptor can be instantiated at most once per
//! context.
//!
//! Contexts are handed out by the [`MetricRegistry`], which also enumerates every live context
//! for export via [`MetricRegistry::snapshot`].
//!
//! ## Tablet metrics
//! [`TabletMetrics`] binds every tablet metric to a tablet's context in one step: either all of
//! them are bound, or construction fails and nothing is left behind.  Once bound, recording into
//! them never fails.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use tablet_metrics::{
//!     tablet::{self, ExternalConsistencyMode, ProbeStats, TabletMetrics},
//!     DescriptorRegistry, MetricRegistry,
//! };
//!
//! # fn main() -> Result<(), tablet_metrics::ConfigurationError> {
//! let mut descriptors = DescriptorRegistry::builder();
//! tablet::register_descriptors(&mut descriptors)?;
//! let registry = MetricRegistry::new(descriptors.build());
//!
//! let ctx = registry.find_or_create_context(tablet::ENTITY_TYPE, "tablet-0001");
//! let metrics = TabletMetrics::new(&ctx)?;
//!
//! metrics.record_insert();
//! metrics.add_probe_stats(&ProbeStats::new(2, 1, 0, 1));
//! metrics.record_write_duration(ExternalConsistencyMode::CommitWait, Duration::from_millis(5));
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.counter("rows_inserted"), Some(1));
//! assert_eq!(snapshot.counter("blooms_consulted"), Some(2));
//! # Ok(())
//! # }
//! ```
#![deny(missing_docs)]

pub mod atomics;

mod common;
pub use self::common::{MetricKind, Unit};

mod context;
pub use self::context::{MetricContext, MetricInstance};

mod descriptor;
pub use self::descriptor::{
    DescriptorRegistry, DescriptorRegistryBuilder, HistogramBounds, MetricDescriptor,
};

mod error;
pub use self::error::ConfigurationError;

mod handles;
pub use self::handles::{Counter, Gauge, Histogram, HistogramSnapshot, DEFAULT_QUANTILES};

mod registry;
pub use self::registry::{Builder, MetricRegistry};

mod snapshot;
pub use self::snapshot::{EntitySnapshot, MetricSnapshot, MetricValue};

pub mod tablet;
pub use self::tablet::TabletMetrics;
