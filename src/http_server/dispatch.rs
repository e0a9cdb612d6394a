//! Routes `/api/*` requests to stored services and turns their results into
//! HTTP responses.

use std::{collections::BTreeMap, collections::HashMap, str::FromStr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{self, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{Map, Value};

use super::{ApiError, ApiState};
use crate::{
    engine::RequestParams,
    models::{Method, Service},
};

/// Invokes the service matching the request's namespace, method and path.
///
/// Query values and the fields of a JSON object body form the parameter
/// map; body fields win over query values of the same name. A query key
/// given more than once arrives as an array.
pub async fn dispatch(
    State(state): State<ApiState>,
    method: http::Method,
    headers: HeaderMap,
    Path(path): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let namespace = state.namespace(&headers);
    let path = format!("/{path}");
    let not_found = || ApiError::NotFound(format!("Service {method}:{path} not found"));

    let method = Method::from_str(method.as_str())
        .ok()
        .filter(Method::is_http)
        .ok_or_else(not_found)?;

    let candidates = state.repo.list_services(&namespace, "").await?;
    let (service, captures) = best_match(candidates, method, &path).ok_or_else(not_found)?;
    tracing::debug!(namespace = %namespace, method = %method, path = %service.path, "Dispatching request.");

    let mut values = query_values(query);
    values.extend(parse_body(&body)?);
    let input = RequestParams { path: captures, values };

    let capabilities = state.capabilities(&namespace);
    let result = state.executor.invoke(Arc::new(service), input, capabilities).await?;

    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::OK);
    Ok((status, response_headers(&result.headers), Json(result.data)).into_response())
}

/// Picks the routable service whose template matches `path`, preferring the
/// one with the fewest captured segments.
fn best_match(
    candidates: Vec<Service>,
    method: Method,
    path: &str,
) -> Option<(Service, HashMap<String, String>)> {
    candidates
        .into_iter()
        .filter(|service| service.method == Some(method) && service.is_routable())
        .filter_map(|service| service.match_path(path).map(|captures| (service, captures)))
        .min_by_key(|(_, captures)| captures.len())
}

/// Folds query pairs into a map; repeated keys collect into an array in
/// the order given.
fn query_values(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut values = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match values.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => *existing = Value::Array(vec![existing.take(), value]),
            None => {
                values.insert(key, value);
            }
        }
    }
    values
}

fn parse_body(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::BadRequest("Request body must be a JSON object".to_string())),
        Err(e) => Err(ApiError::BadRequest(format!("Invalid JSON body: {e}"))),
    }
}

/// Converts handler-set headers; names or values HTTP cannot carry are
/// dropped.
pub(super) fn response_headers(headers: &BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid response header."),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ServiceBuilder;

    #[test]
    fn test_exact_template_wins() {
        let candidates = vec![
            ServiceBuilder::new().path("/users/{id}").build(),
            ServiceBuilder::new().path("/users/me").build(),
            ServiceBuilder::new().path("/users/me").method(Method::Post).build(),
        ];
        let (service, captures) = best_match(candidates.clone(), Method::Get, "/users/me").unwrap();
        assert_eq!(service.path, "/users/me");
        assert!(captures.is_empty());

        let (service, captures) = best_match(candidates, Method::Get, "/users/7").unwrap();
        assert_eq!(service.path, "/users/{id}");
        assert_eq!(captures["id"], "7");
    }

    #[test]
    fn test_local_services_are_not_dispatched() {
        let candidates = vec![ServiceBuilder::new().path("/lib").method(Method::Local).build()];
        assert!(best_match(candidates, Method::Get, "/lib").is_none());
    }

    #[test]
    fn test_repeated_query_keys_become_arrays() {
        let pairs = vec![
            ("ids".to_string(), "1".to_string()),
            ("name".to_string(), "ada".to_string()),
            ("ids".to_string(), "2".to_string()),
            ("ids".to_string(), "3".to_string()),
        ];
        let values = query_values(pairs);
        assert_eq!(values["ids"], serde_json::json!(["1", "2", "3"]));
        assert_eq!(values["name"], "ada");
    }

    #[test]
    fn test_body_must_be_an_object() {
        assert!(parse_body(&Bytes::from_static(b"")).unwrap().is_empty());
        assert_eq!(parse_body(&Bytes::from_static(br#"{"a":1}"#)).unwrap()["a"], 1);
        assert!(matches!(parse_body(&Bytes::from_static(b"[1]")), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_body(&Bytes::from_static(b"{")), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let mut headers = BTreeMap::new();
        headers.insert("X-Good".to_string(), "yes".to_string());
        headers.insert("bad header".to_string(), "x".to_string());
        headers.insert("X-Bad-Value".to_string(), "line\nbreak".to_string());

        let map = response_headers(&headers);
        assert_eq!(map.len(), 1);
        assert_eq!(map["x-good"], "yes");
    }
}
