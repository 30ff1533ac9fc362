//! Public status and liveness pages.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::config::Configuration;
use crate::database::Database;

const OK: &str = "ok";
const UNAVAILABLE: &str = "unavailable";

/// Structured configuration.
#[derive(Serialize)]
pub struct Status {
    version: String,
    name: String,
}

/// Public server status (configuration).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Status> {
    Json(Status {
        version: config.version().to_owned(),
        name: config.name.clone(),
    })
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub database: String,
    pub service: String,
}

/// Liveness of the service and its store.
pub async fn healthcheck(
    State(db): State<Database>,
) -> (StatusCode, Json<Health>) {
    let (status, database) = match db.ping().await {
        Ok(()) => (StatusCode::OK, OK),
        Err(err) => {
            tracing::error!(error = %err, "healthcheck failed");
            (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE)
        },
    };

    (
        status,
        Json(Health {
            database: database.to_owned(),
            service: OK.to_owned(),
        }),
    )
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}
