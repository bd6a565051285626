//! Request router.
//!
//! Maps a verb and a Docker-style path onto simulator operations:
//!
//! | Verb   | Path                      | Operation              |
//! |--------|---------------------------|------------------------|
//! | Read   | `/containers/json`        | list containers        |
//! | Read   | `/containers/{id}/json`   | inspect container      |
//! | Read   | `/images/json`            | list images            |
//! | Read   | `/images/{id}/json`       | inspect image          |
//! | Create | `/containers/create`      | create container       |
//! | Mutate | `/containers/{id}/start`  | start container        |
//! | Mutate | `/containers/{id}/stop`   | stop container         |
//! | Delete | `/containers/{id}`        | remove container       |
//! | Delete | `/images/{id}`            | remove image           |
//!
//! Anything else is [`DockerError::Unrecognized`].

use crate::error::{DockerError, Result};
use crate::types::{
    ContainerCreateRequest, ContainerCreateResponse, ContainerInspect, ContainerSummary,
    ImageInspect, ImageSummary, Reply,
};
use chrono::Utc;
use dockmock_core::{Completion, ListFilter, SimError, Simulator};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Kind of request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Query, no state change.
    Read,
    /// Create a resource.
    Create,
    /// Change a resource's state.
    Mutate,
    /// Remove a resource.
    Delete,
}

impl Verb {
    /// Maps an HTTP method to a verb. `POST` to a path ending in `/create`
    /// creates; any other `POST` or `PUT` mutates.
    #[must_use]
    pub fn from_http(method: &axum::http::Method, path: &str) -> Option<Self> {
        use axum::http::Method;
        match *method {
            Method::GET | Method::HEAD => Some(Self::Read),
            Method::DELETE => Some(Self::Delete),
            Method::POST if path.ends_with("/create") => Some(Self::Create),
            Method::POST | Method::PUT => Some(Self::Mutate),
            _ => None,
        }
    }

    /// Parses a verb name (`read`, `create`, `mutate`, `delete`) or an HTTP
    /// method, case-insensitively.
    #[must_use]
    pub fn parse(word: &str, path: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "read" => Some(Self::Read),
            "create" => Some(Self::Create),
            "mutate" => Some(Self::Mutate),
            "delete" => Some(Self::Delete),
            other => axum::http::Method::from_bytes(other.to_ascii_uppercase().as_bytes())
                .ok()
                .and_then(|method| Self::from_http(&method, path)),
        }
    }
}

/// A request against the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Verb.
    pub verb: Verb,
    /// Path, optionally followed by `?query`.
    pub target: String,
    /// JSON body.
    pub body: Option<serde_json::Value>,
}

impl Request {
    /// Creates a read request.
    #[must_use]
    pub fn read(target: impl Into<String>) -> Self {
        Self {
            verb: Verb::Read,
            target: target.into(),
            body: None,
        }
    }

    /// Creates a create request with a JSON body.
    #[must_use]
    pub fn create(target: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            verb: Verb::Create,
            target: target.into(),
            body: Some(body),
        }
    }

    /// Creates a mutate request.
    #[must_use]
    pub fn mutate(target: impl Into<String>) -> Self {
        Self {
            verb: Verb::Mutate,
            target: target.into(),
            body: None,
        }
    }

    /// Creates a delete request.
    #[must_use]
    pub fn delete(target: impl Into<String>) -> Self {
        Self {
            verb: Verb::Delete,
            target: target.into(),
            body: None,
        }
    }

    fn split_target(&self) -> (&str, &str) {
        self.target
            .split_once('?')
            .unwrap_or((self.target.as_str(), ""))
    }
}

/// The outcome of an accepted request, delivered later.
#[must_use = "a pending reply carries the request's outcome"]
pub struct Pending(BoxFuture<'static, Result<Reply>>);

impl Pending {
    fn ready(reply: Reply) -> Self {
        Self(futures::future::ready(Ok(reply)).boxed())
    }

    fn accepted(path: String, completion: Completion<()>) -> Self {
        Self(
            async move {
                completion
                    .await
                    .map(|()| Reply::Accepted)
                    .map_err(|e| DockerError::rejected(path, e))
            }
            .boxed(),
        )
    }
}

impl Future for Pending {
    type Output = Result<Reply>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pending").finish_non_exhaustive()
    }
}

type Query = Vec<(String, String)>;

fn query_value<'a>(query: &'a Query, key: &str) -> Option<&'a str> {
    query
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// `limit` wins over `all`; unparseable values fall back to listing all.
fn list_filter(query: &Query) -> ListFilter {
    if let Some(limit) = query_value(query, "limit") {
        return limit.parse().map_or(ListFilter::All, ListFilter::Latest);
    }
    match query_value(query, "all") {
        None | Some("0" | "false" | "False") => ListFilter::Running,
        Some(_) => ListFilter::All,
    }
}

/// Dispatches requests to a [`Simulator`].
#[derive(Debug, Clone)]
pub struct RequestRouter {
    sim: Simulator,
}

impl RequestRouter {
    /// Creates a router for `sim`.
    #[must_use]
    pub const fn new(sim: Simulator) -> Self {
        Self { sim }
    }

    /// Returns the simulator behind this router.
    #[must_use]
    pub const fn simulator(&self) -> &Simulator {
        &self.sim
    }

    /// Dispatches a request and awaits its outcome.
    ///
    /// # Errors
    ///
    /// Returns the synchronous or deferred failure of the request.
    pub async fn call(&self, request: Request) -> Result<Reply> {
        self.dispatch(request)?.await
    }

    /// Dispatches a request without waiting for deferred work.
    ///
    /// Validation failures are returned at once. On success the returned
    /// [`Pending`] settles when the operation completes; for reads and
    /// creates it is ready immediately.
    ///
    /// # Errors
    ///
    /// Returns [`DockerError::Unrecognized`] if no route matches, otherwise
    /// the validation error of the matched operation.
    pub fn dispatch(&self, request: Request) -> Result<Pending> {
        let (path, raw_query) = request.split_target();
        debug!(verb = ?request.verb, target = %request.target, "dispatch");

        let query: Query = serde_urlencoded::from_str(raw_query)
            .map_err(|e| DockerError::malformed(path, e.to_string()))?;
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let reject = |e: SimError| DockerError::rejected(path, e);
        let engine = self.sim.engine();
        let store = self.sim.store();

        match (request.verb, segments.as_slice()) {
            (Verb::Read, ["containers", "json"]) => {
                let now = Utc::now();
                let list = engine
                    .list_containers(list_filter(&query))
                    .iter()
                    .map(|c| ContainerSummary::new(c, now))
                    .collect();
                Ok(Pending::ready(Reply::Containers(list)))
            }
            (Verb::Read, ["containers", id, "json"]) => {
                let container = store
                    .container(id)
                    .ok_or_else(|| reject(SimError::ContainerNotFound((*id).to_string())))?;
                Ok(Pending::ready(Reply::Container(ContainerInspect::from(
                    &container,
                ))))
            }
            (Verb::Read, ["images", "json"]) => {
                let list = store.list_images().iter().map(ImageSummary::from).collect();
                Ok(Pending::ready(Reply::Images(list)))
            }
            (Verb::Read, ["images", name @ .., "json"]) if !name.is_empty() => {
                let reference = name.join("/");
                let image = store
                    .image(&reference)
                    .ok_or_else(|| reject(SimError::ImageNotFound(reference.clone())))?;
                Ok(Pending::ready(Reply::Image(ImageInspect::from(&image))))
            }
            (Verb::Create, ["containers", "create"]) => {
                let body = request
                    .body
                    .clone()
                    .ok_or_else(|| DockerError::malformed(path, "missing body"))?;
                let body: ContainerCreateRequest = serde_json::from_value(body)
                    .map_err(|e| DockerError::malformed(path, e.to_string()))?;
                let mut created = engine
                    .create(
                        query_value(&query, "name"),
                        &body.image,
                        body.cmd.unwrap_or_default(),
                    )
                    .map_err(reject)?;
                let id = created
                    .try_take()
                    .unwrap_or_else(|| {
                        Err(SimError::Runtime("create did not complete".to_string()))
                    })
                    .map_err(reject)?;
                Ok(Pending::ready(Reply::Created(ContainerCreateResponse {
                    id: id.to_string(),
                })))
            }
            (Verb::Mutate, ["containers", id, "start"]) => {
                let completion = engine.start(id).map_err(reject)?;
                Ok(Pending::accepted(path.to_string(), completion))
            }
            (Verb::Mutate, ["containers", id, "stop"]) => {
                let completion = engine.stop(id).map_err(reject)?;
                Ok(Pending::accepted(path.to_string(), completion))
            }
            (Verb::Delete, ["containers", id]) => {
                let completion = engine.remove_container(id).map_err(reject)?;
                Ok(Pending::accepted(path.to_string(), completion))
            }
            (Verb::Delete, ["images", name @ ..]) if !name.is_empty() => {
                let completion = engine.remove_image(&name.join("/")).map_err(reject)?;
                Ok(Pending::accepted(path.to_string(), completion))
            }
            _ => {
                debug!(verb = ?request.verb, target = %request.target, "no route");
                Err(DockerError::Unrecognized(request.target.clone()))
            }
        }
    }
}
