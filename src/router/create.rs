use axum::extract::State;
use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::router::JsonBody;
use crate::user::{IdentityService, UserCandidate};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub token: String,
    pub refresh_token: String,
}

/// Handler to create user.
pub async fn handler(
    State(service): State<IdentityService>,
    JsonBody(body): JsonBody<UserCandidate>,
) -> Result<(StatusCode, Json<Response>)> {
    let user = service.create_user(body).await?;

    Ok((
        StatusCode::CREATED,
        Json(Response {
            id: user.id,
            token: user.token,
            refresh_token: user.refresh_token,
        }),
    ))
}
