//! HTTP API.
pub mod create;
pub mod login;
pub mod status;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::header;
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router, middleware};
use serde::de::DeserializeOwned;

use crate::token::TokenKind;
use crate::{AppState, ServerError};

const BEARER: &str = "Bearer ";

/// JSON body extractor answering with a problem document on decoding
/// failures.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// Custom middleware for authentification.
///
/// Only access tokens are accepted. Verified [`crate::token::Claims`] are
/// added to request extensions.
async fn auth(
    State(state): State<AppState>,
    mut req: Request,
    next: middleware::Next,
) -> Result<Response, ServerError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER))
        .ok_or(ServerError::Unauthorized)?;

    let claims = state
        .service
        .verify_token(token)
        .ok()
        .filter(|claims| claims.typ == TokenKind::Access)
        .ok_or(ServerError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        // `DELETE /user/delete/{id}` goes to `delete`. Authorization required.
        .route("/delete/{user_id}", delete(users::delete))
        // `DELETE /user/soft/{id}` goes to `soft_delete`. Authorization required.
        .route("/soft/{user_id}", delete(users::soft_delete))
        .route_layer(middleware::from_fn_with_state(state, auth));

    Router::new()
        // `POST /user` goes to `create`.
        .route("/", post(create::handler))
        // `POST /user/login` goes to `login`.
        .route("/login", post(login::handler))
        // `GET /user/{id}` goes to `get`.
        .route("/{user_id}", get(users::get))
        // `PUT /user/update/{id}` goes to `update`.
        .route("/update/{user_id}", put(users::update))
        .merge(protected)
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub fn state() -> AppState {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::Configuration;
    use crate::database::Database;
    use crate::token::FixedClock;
    use crate::user::{IdentityService, InMemoryUserStore};

    let store = Arc::new(InMemoryUserStore::new());
    let clock = Arc::new(FixedClock::new(chrono::Utc::now()));
    AppState {
        config: Arc::new(Configuration::default()),
        db: Database::from_store(store.clone(), Duration::from_secs(1)),
        service: IdentityService::testing(store, clock),
        metrics: None,
    }
}
