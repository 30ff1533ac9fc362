//! Users-related HTTP API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::router::JsonBody;
use crate::token::Claims;
use crate::user::{DniType, IdentityService, User, UserCandidate};

/// Public view of a [`User`]. Password and tokens are never sent back.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub dni: u64,
    pub type_dni: DniType,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: u64,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            dni: user.dni,
            type_dni: user.type_dni,
            name: user.name,
            email: user.email,
            address: user.address,
            phone: user.phone,
            enabled: user.enabled,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub user: UserView,
}

pub async fn get(
    State(service): State<IdentityService>,
    Path(user_id): Path<String>,
) -> Result<Json<Response>> {
    let user = service.get_user(&user_id).await?;

    Ok(Json(Response { user: user.into() }))
}

pub async fn update(
    State(service): State<IdentityService>,
    Path(user_id): Path<String>,
    JsonBody(body): JsonBody<UserCandidate>,
) -> Result<Json<Response>> {
    let user = service.update_user(&user_id, body).await?;

    Ok(Json(Response { user: user.into() }))
}

/// Remove a user for good.
pub async fn delete(
    State(service): State<IdentityService>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<StatusCode> {
    tracing::info!(user_id = %user_id, requested_by = %claims.sub, "hard delete requested");
    service.delete_user(&user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Disable a user.
pub async fn soft_delete(
    State(service): State<IdentityService>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<StatusCode> {
    tracing::info!(user_id = %user_id, requested_by = %claims.sub, "soft delete requested");
    service.soft_delete_user(&user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::router::create::tests::{body, create};
    use crate::*;

    #[tokio::test]
    async fn test_get_handler() {
        let app = app(router::state());
        let created = create(app.clone()).await;

        let response = make_request(
            None,
            app.clone(),
            Method::GET,
            &format!("/user/{}", created.id),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = read_body(response).await;
        assert_eq!(body["user"]["id"], created.id);
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["type_dni"], "CC");
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("token").is_none());

        let response = make_request(
            None,
            app,
            Method::GET,
            "/user/000000000000000000000000",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_handler() {
        let app = app(router::state());
        let created = create(app.clone()).await;

        let mut update = body();
        update["name"] = json!("Sam Roe");
        update["address"] = json!("Calle 1");

        let response = make_request(
            None,
            app.clone(),
            Method::PUT,
            &format!("/user/update/{}", created.id),
            update.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response: router::users::Response = read_body(response).await;
        assert_eq!(response.user.id, created.id);
        assert_eq!(response.user.name, "Sam Roe");
        assert_eq!(response.user.address, "Calle 1");

        update["name"] = json!("Sam R0e");
        let response = make_request(
            None,
            app,
            Method::PUT,
            &format!("/user/update/{}", created.id),
            update.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_handlers() {
        let app = app(router::state());
        let created = create(app.clone()).await;
        let token = format!("Bearer {}", created.token);

        let response = make_request(
            Some(&token),
            app.clone(),
            Method::DELETE,
            &format!("/user/soft/{}", created.id),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Disabled users are reported, not hidden.
        let response = make_request(
            None,
            app.clone(),
            Method::GET,
            &format!("/user/{}", created.id),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = make_request(
            Some(&token),
            app.clone(),
            Method::DELETE,
            &format!("/user/delete/{}", created.id),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = make_request(
            None,
            app.clone(),
            Method::GET,
            &format!("/user/{}", created.id),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = make_request(
            Some(&token),
            app,
            Method::DELETE,
            &format!("/user/delete/{}", created.id),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
