//! The simulator handle.

use crate::config::Config;
use crate::error::Result;
use crate::event::EventBus;
use crate::fixtures;
use crate::lifecycle::LifecycleEngine;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::store::ResourceStore;
use std::sync::Arc;
use tracing::info;

struct SimulatorInner {
    config: Config,
    store: Arc<ResourceStore>,
    events: Arc<EventBus>,
    engine: LifecycleEngine,
}

/// One simulated backend.
///
/// Cloning is cheap and every clone shares the same store, event bus and
/// engine. Independent simulators share nothing.
#[derive(Clone)]
pub struct Simulator {
    inner: Arc<SimulatorInner>,
}

impl Simulator {
    /// Creates a simulator that defers work through `scheduler`.
    ///
    /// The demo data is loaded when `config.fixtures.seed` is set.
    #[must_use]
    pub fn new(config: Config, scheduler: Arc<dyn Scheduler>) -> Self {
        let store = Arc::new(ResourceStore::new());
        let events = Arc::new(EventBus::new(config.events.capacity));
        let engine = LifecycleEngine::new(
            Arc::clone(&store),
            Arc::clone(&events),
            scheduler,
            config.engine.clone(),
        );

        if config.fixtures.seed {
            engine.load(fixtures::demo_images(), fixtures::demo_containers());
        }

        info!(
            latency_ms = config.engine.latency_ms,
            containers = store.container_count(),
            images = store.image_count(),
            "Simulator initialized"
        );

        Self {
            inner: Arc::new(SimulatorInner {
                config,
                store,
                events,
                engine,
            }),
        }
    }

    /// Creates a simulator on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside of a tokio runtime.
    pub fn with_tokio(config: Config) -> Result<Self> {
        let scheduler = TokioScheduler::new()?;
        Ok(Self::new(config, Arc::new(scheduler)))
    }

    /// Returns the configuration the simulator was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the resource store.
    #[must_use]
    pub fn store(&self) -> &ResourceStore {
        &self.inner.store
    }

    /// Returns the event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Returns the lifecycle engine.
    #[must_use]
    pub fn engine(&self) -> &LifecycleEngine {
        &self.inner.engine
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("containers", &self.inner.store.container_count())
            .field("images", &self.inner.store.image_count())
            .finish_non_exhaustive()
    }
}
