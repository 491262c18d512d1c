//! In-process stand-in for the API server, for request-shape tests.

use http::{Method, Request, Response, StatusCode, header};
use kube::Client;
use kube::client::Body;
use serde_json::Value;
use tower_test::mock::{self, Handle};

pub type ApiHandle = Handle<Request<Body>, Response<Body>>;

/// A client whose requests arrive on the returned handle.
pub fn client() -> (Client, ApiHandle) {
    let (service, handle) = mock::pair::<Request<Body>, Response<Body>>();
    (Client::new(service, "default"), handle)
}

/// What the client sent.
#[derive(Debug)]
pub struct Seen {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub content_type: Option<String>,
    pub body: Value,
}

/// Answer the next request with a JSON body.
pub async fn reply(handle: &mut ApiHandle, status: StatusCode, body: Value) -> Seen {
    reply_raw(handle, status, serde_json::to_vec(&body).unwrap()).await
}

pub async fn reply_raw(handle: &mut ApiHandle, status: StatusCode, body: Vec<u8>) -> Seen {
    let (request, send) = handle
        .next_request()
        .await
        .expect("client made no request");
    let (parts, sent) = request.into_parts();
    let sent = sent.collect_bytes().await.unwrap();
    send.send_response(
        Response::builder()
            .status(status)
            .body(Body::from(body))
            .unwrap(),
    );
    Seen {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().unwrap_or_default().to_string(),
        content_type: parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&sent).unwrap_or(Value::Null),
    }
}

/// Discovery document for a group/version with one resource.
pub fn resource_list(group_version: &str, plural: &str, kind: &str, namespaced: bool) -> Value {
    serde_json::json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": [{
            "name": plural,
            "singularName": kind.to_lowercase(),
            "namespaced": namespaced,
            "kind": kind,
            "verbs": ["create", "delete", "get", "list", "patch", "update"],
        }],
    })
}

pub fn status(code: u16, reason: &str, message: &str) -> Value {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code,
    })
}
