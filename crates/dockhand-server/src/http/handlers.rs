//! Service endpoint handlers.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::auth::Authenticated;
use crate::http::error::{ApiError, Operation};
use crate::state::AppState;

/// Request body for creating a service.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateServiceRequest {
    pub service_name: String,
    pub docker_compose_content: String,
}

/// Optional request body for start and deploy.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LifecycleRequest {
    /// Log in to the configured registry before touching images
    pub is_private: bool,
}

/// Success body shared by the lifecycle endpoints.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceResponse {
    pub message: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub warning: Option<String>,
}

impl ServiceResponse {
    fn new(message: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            service: service.into(),
            warning: None,
        }
    }

    fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }
}

/// Parse a JSON body; an empty body yields the default value.
fn parse_optional<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)
}

/// POST /services - Create a service from a compose descriptor.
pub async fn create_service(
    State(state): State<AppState>,
    _auth: Authenticated,
    body: Bytes,
) -> Result<(StatusCode, Json<ServiceResponse>), ApiError> {
    let req: CreateServiceRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::InvalidJson)?;

    if req.service_name.is_empty() {
        return Err(ApiError::Validation("service_name is required".into()));
    }

    let name = state
        .manager
        .create(&req.service_name, &req.docker_compose_content)
        .await
        .map_err(ApiError::service(Operation::Create))?;

    Ok((
        StatusCode::CREATED,
        Json(ServiceResponse::new("Service created successfully", name.as_str())),
    ))
}

/// POST /services/{name}/start - Start a service and verify it is running.
pub async fn start_service(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ServiceResponse>, ApiError> {
    let req: LifecycleRequest = parse_optional(&body)?;

    state
        .manager
        .start(&name, req.is_private)
        .await
        .map_err(ApiError::service(Operation::Start))?;

    Ok(Json(ServiceResponse::new(
        format!("Service {} started successfully", name),
        name,
    )))
}

/// PUT /services/{name}/deploy - Pull new images and roll them out.
pub async fn deploy_service(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ServiceResponse>, ApiError> {
    let req: LifecycleRequest = parse_optional(&body)?;

    let housekeeping = state
        .manager
        .deploy(&name, req.is_private)
        .await
        .map_err(ApiError::service(Operation::Deploy))?;

    Ok(Json(
        ServiceResponse::new(format!("Service {} deployed successfully", name), name)
            .with_warning(housekeeping.warning()),
    ))
}

/// DELETE /services/{name} - Tear a service down and delete its files.
pub async fn remove_service(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(name): Path<String>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let housekeeping = state
        .manager
        .remove(&name)
        .await
        .map_err(ApiError::service(Operation::Remove))?;

    Ok(Json(
        ServiceResponse::new(format!("Service {} removed successfully", name), name)
            .with_warning(housekeeping.warning()),
    ))
}

/// GET /services - List service names.
pub async fn list_services(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<serde_json::Value>, ApiError> {
    let names = state
        .manager
        .list()
        .await
        .map_err(ApiError::service(Operation::List))?;

    let services: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    Ok(Json(json!({ "services": services })))
}

/// GET /services/{name} - Current compose descriptor of a service.
pub async fn get_service(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let content = state
        .manager
        .definition(&name)
        .await
        .map_err(ApiError::service(Operation::Read))?;

    Ok(Json(json!({
        "service": name,
        "docker_compose_content": content,
    })))
}

/// GET /health - Liveness check, no authentication.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
