//! Builders for the provider's wire payloads.

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::graph::transport::{TransportFailure, TransportResponse};

pub fn json_response(status: StatusCode, body: Value) -> TransportResponse {
    TransportResponse {
        status,
        retry_after: None,
        content_type: Some("application/json".to_owned()),
        body: body.to_string(),
    }
}

pub fn text_response(status: StatusCode, body: &str) -> TransportResponse {
    TransportResponse {
        status,
        retry_after: None,
        content_type: Some("text/plain".to_owned()),
        body: body.to_owned(),
    }
}

/// A 429 carrying an optional `Retry-After` hint.
pub fn throttled(retry_after: Option<f64>) -> TransportResponse {
    TransportResponse {
        status: StatusCode::TOO_MANY_REQUESTS,
        retry_after,
        content_type: Some("application/json".to_owned()),
        body: json!({ "error": { "code": "activityLimitReached" } }).to_string(),
    }
}

pub fn server_error(status: u16) -> TransportResponse {
    TransportResponse {
        status: StatusCode::from_u16(status).expect("valid status code"),
        retry_after: None,
        content_type: Some("application/json".to_owned()),
        body: json!({ "error": { "code": "serviceNotAvailable" } }).to_string(),
    }
}

pub fn token_grant(token: &str, expires_in: u64) -> TransportResponse {
    json_response(
        StatusCode::OK,
        json!({ "access_token": token, "expires_in": expires_in }),
    )
}

pub fn token_denied() -> TransportResponse {
    json_response(
        StatusCode::BAD_REQUEST,
        json!({ "error": "invalid_client", "error_description": "AADSTS7000215" }),
    )
}

pub fn unauthorized() -> TransportResponse {
    json_response(
        StatusCode::UNAUTHORIZED,
        json!({ "error": { "code": "InvalidAuthenticationToken" } }),
    )
}

pub fn connection_reset() -> TransportFailure {
    TransportFailure::new("connection reset by peer")
}

/// A listing entry for a container.
pub fn folder_item(id: &str, name: &str, parent_path: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "folder": { "childCount": 0 },
        "parentReference": { "path": parent_path },
        "createdDateTime": "2024-03-01T10:00:00Z",
        "lastModifiedDateTime": "2024-03-02T10:00:00Z"
    })
}

/// A listing entry for a leaf; `hash` populates the file facet when given.
pub fn file_item(id: &str, name: &str, parent_path: &str, size: i64, hash: Option<&str>) -> Value {
    let mut item = json!({
        "id": id,
        "name": name,
        "size": size,
        "file": {},
        "parentReference": { "path": parent_path },
        "createdDateTime": "2024-03-01T10:00:00Z",
        "lastModifiedDateTime": "2024-03-02T10:00:00Z"
    });
    if let Some(hash) = hash {
        item["file"] = json!({ "hashes": { "quickXorHash": hash } });
    }
    item
}

/// A per-item detail body carrying hash and/or label facets.
pub fn detail_body(id: &str, hash: Option<&str>, label: Option<(&str, &str)>) -> Value {
    let mut body = json!({ "id": id });
    if let Some(hash) = hash {
        body["file"] = json!({ "hashes": { "quickXorHash": hash } });
    }
    if let Some((label_id, label_name)) = label {
        body["sensitivityLabel"] = json!({ "id": label_id, "displayName": label_name });
    }
    body
}

/// One page of a children listing, optionally pointing at a next page.
pub fn page(items: &[Value], next_link: Option<&str>) -> TransportResponse {
    let mut body = json!({ "value": items });
    if let Some(next) = next_link {
        body["@odata.nextLink"] = json!(next);
    }
    json_response(StatusCode::OK, body)
}

/// A `$batch` envelope; one `(id, status, body)` triple per sub-response.
pub fn batch_envelope(subs: &[(usize, u16, Value)]) -> TransportResponse {
    let responses: Vec<Value> = subs
        .iter()
        .map(|(id, status, body)| json!({ "id": id.to_string(), "status": status, "body": body }))
        .collect();
    json_response(StatusCode::OK, json!({ "responses": responses }))
}
