//! Identity is a user account and credential lifecycle service.

#[forbid(unsafe_code)]
#[deny(missing_docs, unused_mut)]
pub mod crypto;
pub mod database;
pub mod error;
mod router;
pub mod telemetry;
pub mod token;
pub mod user;

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::FromRef;
use axum::http::{Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
use error::ServerError;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use crate::crypto::Argon2Hasher;
use crate::token::{JwtIssuer, SystemClock};
use crate::user::IdentityService;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    token: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, token);
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// Decode a JSON response body.
#[cfg(test)]
pub async fn read_body<T: serde::de::DeserializeOwned>(
    response: axum::http::Response<axum::body::Body>,
) -> T {
    use http_body_util::BodyExt;

    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub service: IdentityService,
    pub metrics: Option<PrometheusHandle>,
}

impl FromRef<AppState> for IdentityService {
    fn from_ref(state: &AppState) -> IdentityService {
        state.service.clone()
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `GET /healthcheck` goes to `healthcheck`.
        .route("/healthcheck", get(router::status::healthcheck))
        // `GET /metrics` goes to `metrics`.
        .route("/metrics", get(router::status::metrics))
        .nest("/user", router::router(state.clone()))
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read();

    // handle jwt. a missing secret stops the process.
    let tokens = JwtIssuer::new(config.token.as_ref())?;
    let hasher = Argon2Hasher::new(config.argon2.clone())?;

    let db = database::Database::new(&config.database).await?;

    let service = IdentityService::new(
        Arc::clone(&db.store),
        Arc::new(hasher),
        Arc::new(tokens),
        Arc::new(SystemClock),
    )?;

    let metrics = if config.metrics {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    Ok(AppState {
        config,
        db,
        service,
        metrics,
    })
}
