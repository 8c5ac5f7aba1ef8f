//! Management HTTP surface over a [`Manager`].
//!
//! ```text
//! GET    /projects   200 [{"Path": "..."}]
//! POST   /projects   {"Path": "..."}  -> 204
//! DELETE /projects   {"Path": "..."}  -> 204
//! GET    /health     OK
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::manager::Manager;

/// Wire shape of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPayload {
    #[serde(rename = "Path")]
    pub path: PathBuf,
}

pub fn router(manager: Arc<Manager>) -> Router {
    Router::new()
        .route(
            "/projects",
            get(list_projects).post(add_project).delete(remove_project),
        )
        .route("/health", get(health_check))
        .with_state(manager)
}

/// Serve until `token` is cancelled.
pub async fn serve(
    listener: TcpListener,
    manager: Arc<Manager>,
    token: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        crate::log_event!("server", "listening", "http://{addr}");
    }

    axum::serve(listener, router(manager))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    crate::log_event!("server", "stopped");
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn list_projects(State(manager): State<Arc<Manager>>) -> axum::Json<Vec<ProjectPayload>> {
    let projects = manager
        .paths()
        .into_iter()
        .map(|path| ProjectPayload { path })
        .collect();
    axum::Json(projects)
}

async fn add_project(State(manager): State<Arc<Manager>>, body: Bytes) -> Response {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(rejection) => return rejection.into_response(),
    };

    match manager.add(&payload.path) {
        Ok(outcome) => {
            crate::debug_event!("server", "add", "{} {outcome:?}", payload.path.display());
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            tracing::error!("[server] add {}: {e}", payload.path.display());
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn remove_project(State(manager): State<Arc<Manager>>, body: Bytes) -> Response {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(rejection) => return rejection.into_response(),
    };

    let removed = manager.remove(&payload.path);
    crate::debug_event!("server", "remove", "{} {removed}", payload.path.display());
    StatusCode::NO_CONTENT.into_response()
}

fn parse_payload(body: &[u8]) -> Result<ProjectPayload, (StatusCode, String)> {
    serde_json::from_slice(body).map_err(|e| {
        crate::debug_event!("server", "bad request", "{e}");
        (StatusCode::BAD_REQUEST, e.to_string())
    })
}
