//! API error type mapping lifecycle failures to HTTP status codes.

use axum::http::header::WWW_AUTHENTICATE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use dockhand_core::{CoreError, Step};

/// Realm advertised in `WWW-Authenticate`
pub const AUTH_REALM: &str = "dockhand";

/// Lifecycle operation a request was performing, used to prefix
/// server-side failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Start,
    Deploy,
    Remove,
    List,
    Read,
}

impl Operation {
    fn failure_prefix(self) -> &'static str {
        match self {
            Self::Create => "failed to create service",
            Self::Start => "failed to start service",
            Self::Deploy => "failed to deploy service",
            Self::Remove => "failed to remove service",
            Self::List => "failed to list services",
            Self::Read => "failed to read service",
        }
    }
}

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or wrong Basic credentials.
    Unauthorized,
    /// Request body was not valid JSON.
    InvalidJson,
    /// Request-level validation failure.
    Validation(String),
    /// A lifecycle operation failed.
    Service { op: Operation, source: CoreError },
}

impl ApiError {
    pub fn service(op: Operation) -> impl FnOnce(CoreError) -> Self {
        move |source| Self::Service { op, source }
    }

    /// Status code and message for this error
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            Self::InvalidJson => (StatusCode::BAD_REQUEST, "invalid JSON payload".to_string()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Service { op, source } => match source {
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "service not found".to_string()),
                CoreError::AlreadyExists(_) => {
                    (StatusCode::CONFLICT, "service already exists".to_string())
                }
                // Start reports login failures on their own
                CoreError::Authentication(_) if *op == Operation::Start => {
                    (StatusCode::INTERNAL_SERVER_ERROR, source.to_string())
                }
                // Start succeeded at the runtime but left nothing running
                CoreError::Execution {
                    step: Step::StatusCheck,
                    ..
                } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("service failed to start properly: {}", source),
                ),
                e => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{}: {}", op.failure_prefix(), e),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!("{}", message);
        } else {
            tracing::debug!(status = %status, "{}", message);
        }

        let body = Json(json!({ "error": message }));

        if matches!(self, Self::Unauthorized) {
            let challenge = format!("Basic realm=\"{}\"", AUTH_REALM);
            return (status, [(WWW_AUTHENTICATE, challenge)], body).into_response();
        }

        (status, body).into_response()
    }
}
