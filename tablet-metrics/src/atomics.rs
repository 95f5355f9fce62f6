//! Atomic types used for metrics storage.
//!
//! Counters and gauges always require a 64-bit atomic integer regardless of whether the standard
//! library exposes one for the target architecture, so 32-bit targets fall back to
//! `portable-atomic`.

#[cfg(target_pointer_width = "32")]
pub use portable_atomic::AtomicU64;
#[cfg(not(target_pointer_width = "32"))]
pub use std::sync::atomic::AtomicU64;
