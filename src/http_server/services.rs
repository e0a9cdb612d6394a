//! Handlers for the service administration endpoints.

use std::{str::FromStr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ApiError, ApiState, dispatch::response_headers};
use crate::{
    engine::{RequestParams, coercion::to_plain_string},
    models::{Method, Service},
};

/// Body of the analysis, create and modify endpoints.
#[derive(Debug, Deserialize)]
pub struct SourcePayload {
    /// Display name stored with the service.
    #[serde(default)]
    pub name: String,
    /// Full script text.
    pub source: String,
}

/// Body of the test endpoint.
#[derive(Debug, Deserialize)]
pub struct TestPayload {
    /// Display name of the service under test.
    #[serde(default)]
    pub name: String,
    /// Full script text.
    pub source: String,
    /// Input values; path template parameters are read from here too.
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Query of the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only services whose path starts with this are listed.
    #[serde(default)]
    pub prefix: String,
}

/// Analyzes a source and returns the resulting service metadata.
pub async fn analyze_service(
    State(state): State<ApiState>,
    Json(payload): Json<SourcePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut service = state.analyzer.analyze_async(payload.source).await?;
    service.name = payload.name;
    Ok((StatusCode::OK, Json(service)))
}

/// Analyzes a source and runs its handler once with the given parameters.
/// Nothing is stored.
pub async fn test_service(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<TestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut service = state.analyzer.analyze_async(payload.source.clone()).await?;
    service.name = payload.name;
    service.source = payload.source;
    if service.namespace.is_empty() {
        service.namespace = state.namespace(&headers);
    }

    let mut input = RequestParams::default();
    for name in service.path_params() {
        let value = payload.params.get(name).map(to_plain_string).unwrap_or_default();
        input.path.insert(name.to_string(), value);
    }
    input.values = payload.params;

    let capabilities = state.capabilities(&service.namespace);
    let result = state.executor.invoke(Arc::new(service), input, capabilities).await?;
    Ok((StatusCode::OK, response_headers(&result.headers), Json(result)))
}

/// Analyzes and stores a new service.
pub async fn create_service(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<SourcePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = prepare_service(&state, &headers, payload).await?;
    let path = service.path.clone();
    state.repo.create_service(service).await?;
    Ok((StatusCode::OK, Json(json!({ "msg": format!("Service {path} created successfully") }))))
}

/// Analyzes a source and replaces the stored service it describes.
pub async fn modify_service(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<SourcePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = prepare_service(&state, &headers, payload).await?;
    let path = service.path.clone();
    state.repo.modify_service(service).await?;
    Ok((StatusCode::OK, Json(json!({ "msg": format!("Service {path} modified successfully") }))))
}

/// Retrieves a stored service.
pub async fn get_service(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((method, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let method = parse_method(&method)?;
    let path = format!("/{path}");
    let service = state
        .repo
        .get_service(&state.namespace(&headers), method, &path)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Service {method}:{path} not found")))?;
    Ok((StatusCode::OK, Json(service)))
}

/// Deletes a stored service.
pub async fn delete_service(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((method, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let method = parse_method(&method)?;
    let path = format!("/{path}");
    state.repo.delete_service(&state.namespace(&headers), method, &path).await?;
    Ok((StatusCode::OK, Json(json!({ "msg": format!("Service {path} deleted successfully") }))))
}

/// Lists the namespace's services as `METHOD:path` strings.
pub async fn list_services(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let services = state.repo.list_services(&state.namespace(&headers), &query.prefix).await?;
    let entries: Vec<String> = services
        .iter()
        .filter_map(|service| service.method.map(|m| format!("{m}:{}", service.path)))
        .collect();
    Ok((StatusCode::OK, Json(entries)))
}

async fn prepare_service(
    state: &ApiState,
    headers: &HeaderMap,
    payload: SourcePayload,
) -> Result<Service, ApiError> {
    let mut service = state.analyzer.analyze_async(payload.source.clone()).await?;
    if service.is_empty() {
        return Err(ApiError::BadRequest("Script defines no service".to_string()));
    }
    if service.namespace.is_empty() {
        service.namespace = state.namespace(headers);
    }
    service.name = payload.name;
    service.source = payload.source;
    Ok(service)
}

fn parse_method(method: &str) -> Result<Method, ApiError> {
    Method::from_str(method).map_err(|_| ApiError::BadRequest(format!("Method {method} not found")))
}
