//! HTTP surface.
//!
//! Every request goes through one fallback handler that hands the verb and
//! target to the [`RequestRouter`], so routing lives in a single table.
//! A leading API version segment such as `/v1.43` is ignored.

use crate::error::{DockerError, Result};
use crate::router::{Request, RequestRouter, Verb};
use crate::types::Reply;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use dockmock_core::Simulator;

/// Application state shared with the handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Request router.
    pub router: RequestRouter,
}

/// Creates the HTTP router for `sim`.
#[must_use]
pub fn create_router(sim: Simulator) -> Router {
    let state = AppState {
        router: RequestRouter::new(sim),
    };
    Router::new().fallback(handle).with_state(state)
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted => StatusCode::NO_CONTENT.into_response(),
            Self::Created(_) => (StatusCode::CREATED, Json(self)).into_response(),
            _ => (StatusCode::OK, Json(self)).into_response(),
        }
    }
}

fn strip_version(target: &str) -> &str {
    let Some(rest) = target.strip_prefix("/v") else {
        return target;
    };
    let end = rest.find('/').unwrap_or(rest.len());
    let version = &rest[..end];
    let is_version = !version.is_empty()
        && version.chars().all(|c| c.is_ascii_digit() || c == '.')
        && version.chars().next().is_some_and(|c| c.is_ascii_digit());
    if is_version && end < rest.len() {
        &rest[end..]
    } else {
        target
    }
}

async fn handle(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Reply> {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());
    let target = strip_version(target);
    let path = target.split('?').next().unwrap_or(target);

    let verb = Verb::from_http(&method, path)
        .ok_or_else(|| DockerError::Unrecognized(format!("{method} {target}")))?;
    let body = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice(&body)
                .map_err(|e| DockerError::malformed(path, e.to_string()))?,
        )
    };

    state
        .router
        .call(Request {
            verb,
            target: target.to_string(),
            body,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_prefix_is_stripped() {
        assert_eq!(strip_version("/v1.43/containers/json"), "/containers/json");
        assert_eq!(strip_version("/v1.12/images/json?all=1"), "/images/json?all=1");
        assert_eq!(strip_version("/containers/json"), "/containers/json");
        assert_eq!(strip_version("/volumes"), "/volumes");
        assert_eq!(strip_version("/v1.43"), "/v1.43");
    }
}
