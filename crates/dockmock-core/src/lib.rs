//! # dockmock-core
//!
//! In-memory simulation of a container/image management backend.
//!
//! This crate provides everything behind the request surface:
//!
//! - Resource store for containers and images
//! - Lifecycle engine (create, start, stop, remove)
//! - Deferred completion through a pluggable scheduler
//! - Event bus for `{status, id}` change notifications
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Simulator                   │
//! │  ┌─────────────────┐    ┌─────────────────┐  │
//! │  │ LifecycleEngine │───►│    Scheduler    │  │
//! │  └────────┬────────┘    └────────┬────────┘  │
//! │           │  validate            │ commit    │
//! │           ▼                      ▼           │
//! │  ┌─────────────────┐    ┌─────────────────┐  │
//! │  │  ResourceStore  │    │    EventBus     │  │
//! │  └─────────────────┘    └─────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every operation returns at once, with either an error or a
//! [`Completion`]. Committed mutations are announced on the [`EventBus`].

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod completion;
pub mod config;
pub mod error;
pub mod event;
pub mod fixtures;
pub mod lifecycle;
pub mod scheduler;
pub mod simulator;
pub mod state;
pub mod store;

pub use completion::Completion;
pub use config::Config;
pub use error::{Result, SimError};
pub use event::{Event, EventBus, EventStatus, SubscriptionId};
pub use lifecycle::LifecycleEngine;
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
pub use simulator::Simulator;
pub use state::{Container, ContainerId, ContainerState, Image, ImageConfig, ImageId, PortMapping};
pub use store::{ListFilter, ResourceStore};
