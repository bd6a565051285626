//! Lifecycle engine.
//!
//! Validates requested transitions against the store and applies them,
//! either at once or through the scheduler after the configured latency.
//!
//! ```text
//!   absent ──create──► created ──start──► running ──stop──► exited
//!                         │                  ▲                 │
//!                         │                  └──────start──────┤
//!                         └─────────remove──────────────────── ┴──► removed
//! ```
//!
//! Validation happens when the call is made; the deferred commit does not
//! validate again. Two overlapping calls on one container can therefore both
//! commit, which the simulated backend accepts.

use crate::completion::Completion;
use crate::config::EngineConfig;
use crate::error::{Result, SimError};
use crate::event::{Event, EventBus, EventStatus};
use crate::scheduler::Scheduler;
use crate::state::{Container, ContainerId, Image};
use crate::store::{ListFilter, ResourceStore, StoreWriter};
use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies `f` inside one store transaction and delivers its event after
/// the transaction is released.
fn commit<T>(
    store: &ResourceStore,
    events: &EventBus,
    f: impl FnOnce(&mut StoreWriter<'_>) -> Result<(T, Option<Event>)>,
) -> Result<T> {
    let value = {
        let mut writer = store.write();
        let (value, event) = f(&mut writer)?;
        if let Some(event) = event {
            events.enqueue(event);
        }
        value
    };
    events.flush();
    Ok(value)
}

/// Validates and applies container and image transitions.
pub struct LifecycleEngine {
    store: Arc<ResourceStore>,
    events: Arc<EventBus>,
    scheduler: Arc<dyn Scheduler>,
    config: EngineConfig,
    next_pid: AtomicU32,
}

impl LifecycleEngine {
    /// Creates an engine operating on `store`.
    #[must_use]
    pub fn new(
        store: Arc<ResourceStore>,
        events: Arc<EventBus>,
        scheduler: Arc<dyn Scheduler>,
        config: EngineConfig,
    ) -> Self {
        let next_pid = AtomicU32::new(config.first_pid);
        Self {
            store,
            events,
            scheduler,
            config,
            next_pid,
        }
    }

    /// Loads records without emitting events.
    pub(crate) fn load(&self, images: Vec<Image>, containers: Vec<Container>) {
        let mut writer = self.store.write();
        for image in images {
            writer.insert_image(image);
        }
        for container in containers {
            writer.insert_container(container);
        }
    }

    /// Lists containers matching `filter`.
    #[must_use]
    pub fn list_containers(&self, filter: ListFilter) -> Vec<Container> {
        self.store.list_containers(filter)
    }

    /// Creates a container from `image`. The container is not started.
    ///
    /// An empty `cmd` inherits the image's default command. The container is
    /// in the store and the `create` event delivered before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ImageNotFound`] if `image` does not resolve.
    pub fn create(
        &self,
        name: Option<&str>,
        image: &str,
        cmd: Vec<String>,
    ) -> Result<Completion<ContainerId>> {
        let id = commit(&self.store, &self.events, |w| {
            let resolved = w
                .image(image)
                .ok_or_else(|| SimError::ImageNotFound(image.to_string()))?;
            let cmd = if cmd.is_empty() {
                resolved.config.cmd.clone()
            } else {
                cmd
            };

            let mut container = Container::new(image, cmd, Utc::now());
            while w.contains_container(&container.id) {
                container.id = ContainerId::new();
            }
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                container = container.with_name(name);
            }

            let id = container.id.clone();
            w.insert_container(container);
            let event = Event::new(EventStatus::Create, id.as_str());
            Ok((id, Some(event)))
        })?;

        debug!(id = %id, image, "container created");
        Ok(Completion::ready(Ok(id)))
    }

    /// Starts a container after the configured latency.
    ///
    /// The completion resolves once the transition has committed. The
    /// `start` event is queued in the same commit.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ContainerNotFound`] for an unknown container and
    /// [`SimError::InvalidState`] if it is already running.
    pub fn start(&self, reference: &str) -> Result<Completion<()>> {
        let container = self
            .store
            .container(reference)
            .ok_or_else(|| SimError::ContainerNotFound(reference.to_string()))?;
        if container.is_running() {
            return Err(SimError::invalid_state(
                container.id.as_str(),
                "already running",
            ));
        }

        let id = container.id;
        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed);
        let (resolver, completion) = Completion::pending();
        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.events);
        debug!(id = %id, pid, "start accepted");

        self.scheduler.schedule(
            self.config.latency(),
            Box::new(move || {
                let result = commit(&store, &events, |w| {
                    if w.update_container_state(&id, |s| s.mark_running(pid, Utc::now())) {
                        Ok(((), Some(Event::new(EventStatus::Start, id.as_str()))))
                    } else {
                        Err(SimError::ContainerNotFound(id.to_string()))
                    }
                });
                match &result {
                    Ok(()) => debug!(id = %id, pid, "container started"),
                    Err(e) => warn!(id = %id, error = %e, "start skipped"),
                }
                resolver.resolve(result);
            }),
        );

        Ok(completion)
    }

    /// Stops a running container.
    ///
    /// Two phases: the `die` event is delivered and the completion settled
    /// before this returns; the container is marked exited with the
    /// configured exit code, and `stop` delivered, only after the latency.
    /// Stopping a container that is not running succeeds without effect.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ContainerNotFound`] for an unknown container.
    pub fn stop(&self, reference: &str) -> Result<Completion<()>> {
        let accepted = commit(&self.store, &self.events, |w| {
            let container = w
                .container(reference)
                .ok_or_else(|| SimError::ContainerNotFound(reference.to_string()))?;
            if !container.is_running() {
                return Ok((None, None));
            }
            let id = container.id.clone();
            let event = Event::new(EventStatus::Die, id.as_str());
            Ok((Some(id), Some(event)))
        })?;

        let Some(id) = accepted else {
            debug!(reference, "stop on a container that is not running");
            return Ok(Completion::ready(Ok(())));
        };

        let exit_code = self.config.stop_exit_code;
        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.events);
        debug!(id = %id, "stop accepted");

        self.scheduler.schedule(
            self.config.latency(),
            Box::new(move || {
                let result = commit(&store, &events, |w| {
                    if w.update_container_state(&id, |s| s.mark_exited(exit_code, Utc::now())) {
                        Ok(((), Some(Event::new(EventStatus::Stop, id.as_str()))))
                    } else {
                        Err(SimError::ContainerNotFound(id.to_string()))
                    }
                });
                match result {
                    Ok(()) => debug!(id = %id, exit_code, "container stopped"),
                    Err(e) => warn!(id = %id, error = %e, "stop skipped"),
                }
            }),
        );

        Ok(Completion::ready(Ok(())))
    }

    /// Removes a container that is not running, after the latency.
    ///
    /// The completion resolves once the removal has committed. The
    /// `destroy` event is queued in the same commit.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ContainerNotFound`] for an unknown container and
    /// [`SimError::InvalidState`] if it is running.
    pub fn remove_container(&self, reference: &str) -> Result<Completion<()>> {
        let container = self
            .store
            .container(reference)
            .ok_or_else(|| SimError::ContainerNotFound(reference.to_string()))?;
        if container.is_running() {
            return Err(SimError::invalid_state(
                container.id.as_str(),
                "cannot remove a running container",
            ));
        }

        let id = container.id;
        let (resolver, completion) = Completion::pending();
        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.events);
        debug!(id = %id, "remove accepted");

        self.scheduler.schedule(
            self.config.latency(),
            Box::new(move || {
                let result = commit(&store, &events, |w| match w.remove_container(&id) {
                    Some(_) => Ok(((), Some(Event::new(EventStatus::Destroy, id.as_str())))),
                    None => Err(SimError::ContainerNotFound(id.to_string())),
                });
                match &result {
                    Ok(()) => debug!(id = %id, "container removed"),
                    Err(e) => warn!(id = %id, error = %e, "remove skipped"),
                }
                resolver.resolve(result);
            }),
        );

        Ok(completion)
    }

    /// Removes an image.
    ///
    /// Two phases: `untag` is delivered and the completion settled before
    /// this returns; the image leaves the store, and `delete` is delivered,
    /// after the latency. Containers created from the image are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ImageNotFound`] for an unknown image.
    pub fn remove_image(&self, reference: &str) -> Result<Completion<()>> {
        let id = commit(&self.store, &self.events, |w| {
            let image = w
                .image(reference)
                .ok_or_else(|| SimError::ImageNotFound(reference.to_string()))?;
            let id = image.id.clone();
            let event = Event::new(EventStatus::Untag, id.as_str());
            Ok((id, Some(event)))
        })?;

        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.events);
        debug!(id = %id, "image removal accepted");

        self.scheduler.schedule(
            self.config.latency(),
            Box::new(move || {
                let result = commit(&store, &events, |w| match w.remove_image(&id) {
                    Some(_) => Ok(((), Some(Event::new(EventStatus::Delete, id.as_str())))),
                    None => Err(SimError::ImageNotFound(id.to_string())),
                });
                match result {
                    Ok(()) => debug!(id = %id, "image removed"),
                    Err(e) => warn!(id = %id, error = %e, "image removal skipped"),
                }
            }),
        );

        Ok(Completion::ready(Ok(())))
    }
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
