use axum::extract::State;
use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::router::JsonBody;
use crate::user::IdentityService;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Deserialize, Serialize)]
pub struct Body {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub token_type: String,
    pub token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Handler to log a user in.
pub async fn handler(
    State(service): State<IdentityService>,
    JsonBody(body): JsonBody<Body>,
) -> Result<(StatusCode, Json<Response>)> {
    let user = service.login(&body.email, &body.password).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(Response {
            token_type: TOKEN_TYPE.to_owned(),
            token: user.token,
            refresh_token: user.refresh_token,
            expires_in: service.access_expiration().as_secs(),
        }),
    ))
}
