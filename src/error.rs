//! Error handler for the identity service.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::user::error::{ErrorKind, IdentityError, ValidationReason};

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("invalid 'Authorization' header")]
    Unauthorized,
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Point the error at a single field.
    pub fn field(mut self, field: &str, message: &str) -> Self {
        self.errors = Some(vec![FieldError {
            field: field.to_owned(),
            message: message.to_owned(),
        }]);
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/problem+json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| issue.code.to_string()),
            })
        })
        .collect()
}

/// Status code sent back for each identity failure.
pub fn status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationFailed
        | ErrorKind::DisabledUser
        | ErrorKind::InvalidCredentials
        | ErrorKind::NothingDeleted => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::EmailTaken => StatusCode::CONFLICT,
        ErrorKind::TokenInvalid => StatusCode::UNAUTHORIZED,
        ErrorKind::HashingFailed
        | ErrorKind::Persistence
        | ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn validation(reason: &ValidationReason) -> ResponseError {
    let response = ResponseError::default()
        .title("There were validation errors with your request.")
        .details(&reason.to_string())
        .status(StatusCode::BAD_REQUEST);

    match reason {
        ValidationReason::Structural(errors) => response.errors(errors),
        ValidationReason::PasswordTooShort => {
            response.field("password", &reason.to_string())
        },
        ValidationReason::PhoneLengthInvalid => {
            response.field("phone", &reason.to_string())
        },
        ValidationReason::NameHasInvalidCharacters => {
            response.field("name", &reason.to_string())
        },
        ValidationReason::DniTypeInvalid => {
            response.field("type_dni", &reason.to_string())
        },
    }
}

fn identity(err: &IdentityError) -> ResponseError {
    let status = status(err.kind());

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "server returned 500 status");
        return ResponseError::default();
    }

    let response = ResponseError::default()
        .details(&err.to_string())
        .status(status);

    match err {
        IdentityError::ValidationFailed { reason } => validation(reason),
        IdentityError::NotFound => response.title("User not found."),
        IdentityError::DisabledUser => response.title("User is disabled."),
        IdentityError::InvalidCredentials => {
            response.title("Invalid email or password.")
        },
        IdentityError::NothingDeleted => response.title("No user was deleted."),
        IdentityError::EmailTaken => response.title("Email is already used."),
        IdentityError::TokenInvalid => {
            response.title("Missing or invalid 'Authorization' header.")
        },
        _ => response,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = match &self {
            ServerError::Identity(err) => identity(err),

            ServerError::Axum(rejection) => ResponseError::default()
                .title("Server error during data parsing.")
                .details(&rejection.body_text())
                .status(StatusCode::BAD_REQUEST),

            ServerError::Unauthorized => ResponseError::default()
                .title("Missing or invalid 'Authorization' header.")
                .details(&self.to_string())
                .status(StatusCode::UNAUTHORIZED),
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/problem+json")
        .body(
            serde_json::json!({
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
