//! # dockmock-docker
//!
//! Docker-style request surface for the dockmock simulator.
//!
//! Requests are a verb plus a Docker Remote API path such as
//! `/containers/{id}/start`. The [`RequestRouter`] maps them onto the
//! simulator and renders replies in Docker's JSON shapes. [`api`] puts the
//! same router behind an Axum HTTP service.
//!
//! ```text
//! console ──► RequestRouter ──► LifecycleEngine / ResourceStore
//!                  ▲
//!        HTTP ─────┘ (api::create_router)
//! ```

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod error;
pub mod router;
pub mod types;

pub use error::{DockerError, ErrorKind, Result};
pub use router::{Pending, Request, RequestRouter, Verb};
pub use types::Reply;
