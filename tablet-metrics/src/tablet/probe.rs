use std::ops::{Add, AddAssign};

/// Lookup counts gathered by a single read or scan operation.
///
/// An operation fills this in as it consults each structure, then hands it to
/// [`TabletMetrics::add_probe_stats`](super::TabletMetrics::add_probe_stats) exactly once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProbeStats {
    /// Number of bloom filter probes.
    pub blooms_consulted: u64,
    /// Number of key index probes.
    pub keys_consulted: u64,
    /// Number of delta file probes.
    pub deltas_consulted: u64,
    /// Number of in-memory row store probes.
    pub mrs_consulted: u64,
}

impl ProbeStats {
    /// Creates a new `ProbeStats` from the four counts.
    pub const fn new(
        blooms_consulted: u64,
        keys_consulted: u64,
        deltas_consulted: u64,
        mrs_consulted: u64,
    ) -> Self {
        Self { blooms_consulted, keys_consulted, deltas_consulted, mrs_consulted }
    }

    /// Total number of probes, across every structure.
    pub fn total(&self) -> u64 {
        self.blooms_consulted
            .saturating_add(self.keys_consulted)
            .saturating_add(self.deltas_consulted)
            .saturating_add(self.mrs_consulted)
    }

    /// Returns `true` if no structure was consulted.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Folds the counts of `other` into these counts.
    pub fn merge(&mut self, other: &ProbeStats) {
        self.blooms_consulted = self.blooms_consulted.saturating_add(other.blooms_consulted);
        self.keys_consulted = self.keys_consulted.saturating_add(other.keys_consulted);
        self.deltas_consulted = self.deltas_consulted.saturating_add(other.deltas_consulted);
        self.mrs_consulted = self.mrs_consulted.saturating_add(other.mrs_consulted);
    }
}

impl AddAssign for ProbeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}

impl Add for ProbeStats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}
