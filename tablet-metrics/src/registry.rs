//! The process-wide metrics registration facility.
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use quanta::Clock;
use tracing::debug;

use crate::{DescriptorRegistry, EntitySnapshot, MetricContext};

type ContextMap = HashMap<(&'static str, String), Weak<MetricContext>>;

/// Builder for [`MetricRegistry`].
#[derive(Clone, Debug)]
pub struct Builder {
    clock: Clock,
}

impl Default for Builder {
    fn default() -> Self {
        Self { clock: Clock::new() }
    }
}

impl Builder {
    /// Creates a new [`Builder`] with default values.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the clock used by contexts to time operations.
    ///
    /// Defaults to [`Clock::new`].  Tests can pass a mocked clock to control elapsed time.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the registry around the given descriptors.
    pub fn build(self, descriptors: DescriptorRegistry) -> MetricRegistry {
        debug!(descriptors = descriptors.len(), "created metric registry");
        MetricRegistry {
            descriptors: Arc::new(descriptors),
            clock: self.clock,
            contexts: Mutex::new(HashMap::new()),
        }
    }
}

/// Hands out entity-scoped [`MetricContext`]s and enumerates them for export.
///
/// The registry only holds weak references to the contexts it creates: an entity keeps its
/// context alive, and tearing down the entity is simply a matter of dropping it.
pub struct MetricRegistry {
    descriptors: Arc<DescriptorRegistry>,
    clock: Clock,
    contexts: Mutex<ContextMap>,
}

impl MetricRegistry {
    /// Creates a new `MetricRegistry` with default configuration.
    pub fn new(descriptors: DescriptorRegistry) -> Self {
        Builder::new().build(descriptors)
    }

    /// Creates a new [`Builder`].
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Descriptors that contexts from this registry can instantiate.
    pub fn descriptors(&self) -> &Arc<DescriptorRegistry> {
        &self.descriptors
    }

    /// Gets the live context for the given entity, creating it if necessary.
    pub fn find_or_create_context<I>(&self, entity_type: &'static str, entity_id: I) -> Arc<MetricContext>
    where
        I: Into<String>,
    {
        let entity_id = entity_id.into();
        let mut contexts = self.contexts.lock();
        let key = (entity_type, entity_id);
        if let Some(existing) = contexts.get(&key).and_then(Weak::upgrade) {
            return existing;
        }

        let ctx = Arc::new(MetricContext::new(
            entity_type,
            key.1.clone(),
            Arc::clone(&self.descriptors),
            self.clock.clone(),
        ));
        debug!(entity_type, entity_id = %key.1, "created metric context");
        let _ = contexts.insert(key, Arc::downgrade(&ctx));
        ctx
    }

    /// Number of contexts that are still alive.
    pub fn num_live_contexts(&self) -> usize {
        self.contexts.lock().values().filter(|ctx| ctx.strong_count() > 0).count()
    }

    /// Forgets every context whose entity has been dropped, returning how many were removed.
    pub fn retire_dead_contexts(&self) -> usize {
        let mut contexts = self.contexts.lock();
        let before = contexts.len();
        contexts.retain(|(entity_type, entity_id), ctx| {
            let alive = ctx.strong_count() > 0;
            if !alive {
                debug!(entity_type = *entity_type, entity_id = %entity_id, "retired metric context");
            }
            alive
        });
        before - contexts.len()
    }

    /// Takes a point-in-time snapshot of every live context, ordered by entity.
    ///
    /// Contexts are read one at a time without holding the registry lock, so writers are never
    /// held up by an export in progress.
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        let live: Vec<Arc<MetricContext>> =
            self.contexts.lock().values().filter_map(Weak::upgrade).collect();

        let mut snapshots: Vec<EntitySnapshot> = live.iter().map(|ctx| ctx.snapshot()).collect();
        snapshots.sort_by(|a, b| {
            (a.entity_type, a.entity_id.as_str()).cmp(&(b.entity_type, b.entity_id.as_str()))
        });
        snapshots
    }
}
