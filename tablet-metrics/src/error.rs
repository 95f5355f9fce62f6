use thiserror::Error;

use crate::MetricKind;

/// Errors that could occur while declaring metrics or binding them to an entity.
///
/// All of these are construction-time problems.  Once an entity's metrics are bound, recording
/// values into them cannot fail.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A descriptor with the same name was already defined.
    #[error("metric `{name}` is already defined")]
    DuplicateDescriptor {
        /// Name of the metric.
        name: String,
    },

    /// The histogram parameters cannot produce a valid bucket layout.
    #[error("invalid bounds for histogram `{name}`: {reason}")]
    InvalidHistogramBounds {
        /// Name of the metric.
        name: String,
        /// Details about why the bounds were rejected.
        reason: String,
    },

    /// The descriptor was already instantiated under the same context.
    #[error("metric `{name}` is already instantiated for entity `{entity}`")]
    DuplicateInstance {
        /// Identifier of the entity owning the context.
        entity: String,
        /// Name of the metric.
        name: String,
    },

    /// No descriptor with the given name exists in the descriptor registry.
    #[error("metric `{name}` is not defined")]
    MissingDescriptor {
        /// Name of the metric.
        name: String,
    },

    /// The descriptor exists, but is not of the requested kind.
    #[error("metric `{name}` is a {actual}, not a {expected}")]
    KindMismatch {
        /// Name of the metric.
        name: String,
        /// Kind that was requested.
        expected: MetricKind,
        /// Kind the descriptor was defined with.
        actual: MetricKind,
    },
}
