//! HTTP service: JSON endpoints that forward a caller-supplied kubeconfig
//! and request to the cluster.
//!
//! Every request builds its own client from the kubeconfig in its body and
//! drops it when the response is produced. Nothing is stored.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use kube::api::LogParams;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::apply::{apply_manifest, KubeResourceApi};
use crate::config::{ClientTimeouts, ServerConfig};
use crate::error::{Error, Result};
use crate::k8s;
use crate::models::{ApplyReport, DeletableKind, ResourceType, Row};

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    timeouts: ClientTimeouts,
}

impl AppState {
    pub fn new(config: ServerConfig, timeouts: ClientTimeouts) -> Self {
        Self {
            config: Arc::new(config),
            timeouts,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.body_limit;
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/apply", post(apply_handler))
        .route("/api/list", post(list_handler))
        .route("/api/scale", post(scale_handler))
        .route("/api/delete", post(delete_handler))
        .route("/api/logs", post(logs_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the service until Ctrl-C / SIGTERM.
pub async fn serve(config: ServerConfig, timeouts: ClientTimeouts) -> anyhow::Result<()> {
    let addr = config.listen;
    let app = router(AppState::new(config, timeouts));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Starting kubedeck server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Treat absent and empty strings alike.
fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>, missing: &str) -> Result<T> {
    payload.map(|Json(t)| t).map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::BodyTooLarge(rejection.body_text())
        } else {
            Error::validation(missing)
        }
    })
}

// --- APPLY ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplyRequest {
    pub kubeconfig: Option<String>,
    pub manifest: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub result: ApplyReport,
}

const APPLY_REQUIRED: &str = "kubeconfig and manifest are required";

async fn apply_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ApplyRequest>, JsonRejection>,
) -> Result<Json<ApplyResponse>> {
    let req = body(payload, APPLY_REQUIRED)?;
    let (Some(kubeconfig), Some(manifest)) = (required(&req.kubeconfig), required(&req.manifest))
    else {
        return Err(Error::validation(APPLY_REQUIRED));
    };

    let client = k8s::client_from_kubeconfig(kubeconfig, &state.timeouts).await?;
    let api = KubeResourceApi::new(client, state.config.apply.clone());

    let result = with_deadline(state.config.request_timeout(), |cancel| async move {
        apply_manifest(&api, manifest, &cancel).await
    })
    .await?;

    Ok(Json(ApplyResponse { result }))
}

/// Run `work` with a token that is cancelled once `limit` elapses; a run
/// that stops on that token reports [`Error::Timeout`].
async fn with_deadline<T, F, Fut>(limit: Duration, work: F) -> Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let cancel = CancellationToken::new();
    let _timer = AbortOnDropHandle::new(tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(limit).await;
            cancel.cancel();
        }
    }));

    match work(cancel).await {
        Err(Error::Cancelled) => Err(Error::Timeout(limit.as_secs())),
        other => other,
    }
}

// --- LIST ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListRequest {
    pub kubeconfig: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<Row>,
}

const LIST_REQUIRED: &str = "kubeconfig and type are required";

async fn list_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ListRequest>, JsonRejection>,
) -> Result<Json<ListResponse>> {
    let req = body(payload, LIST_REQUIRED)?;
    let (Some(kubeconfig), Some(resource_type)) =
        (required(&req.kubeconfig), required(&req.resource_type))
    else {
        return Err(Error::validation(LIST_REQUIRED));
    };
    let resource_type: ResourceType = resource_type.parse()?;

    let client = k8s::client_from_kubeconfig(kubeconfig, &state.timeouts).await?;
    let data = k8s::list_resources(client, resource_type, required(&req.namespace)).await?;
    Ok(Json(ListResponse { data }))
}

// --- SCALE ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScaleRequest {
    pub kubeconfig: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub replicas: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ScaleResponse {
    pub replicas: Option<i32>,
}

const SCALE_REQUIRED: &str = "kubeconfig, namespace, name, replicas required";

async fn scale_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScaleRequest>, JsonRejection>,
) -> Result<Json<ScaleResponse>> {
    let req = body(payload, SCALE_REQUIRED)?;
    let (Some(kubeconfig), Some(namespace), Some(name), Some(replicas)) = (
        required(&req.kubeconfig),
        required(&req.namespace),
        required(&req.name),
        req.replicas.as_ref().filter(|v| v.is_number()),
    ) else {
        return Err(Error::validation(SCALE_REQUIRED));
    };
    let replicas = replicas
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| *n >= 0)
        .ok_or_else(|| Error::validation("replicas must be a non-negative integer"))?;

    let client = k8s::client_from_kubeconfig(kubeconfig, &state.timeouts).await?;
    let replicas = k8s::scale_deployment(client, namespace, name, replicas).await?;
    Ok(Json(ScaleResponse { replicas }))
}

// --- DELETE ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteRequest {
    pub kubeconfig: Option<String>,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

const DELETE_REQUIRED: &str = "kubeconfig, kind and name are required";

async fn delete_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>> {
    let req = body(payload, DELETE_REQUIRED)?;
    let (Some(kubeconfig), Some(kind), Some(name)) = (
        required(&req.kubeconfig),
        required(&req.kind),
        required(&req.name),
    ) else {
        return Err(Error::validation(DELETE_REQUIRED));
    };
    let kind: DeletableKind = kind.parse()?;

    let client = k8s::client_from_kubeconfig(kubeconfig, &state.timeouts).await?;
    k8s::delete_resource(client, kind, name, required(&req.namespace)).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}

// --- LOGS ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogsRequest {
    pub kubeconfig: Option<String>,
    pub namespace: Option<String>,
    pub pod: Option<String>,
    pub container: Option<String>,
}

const LOGS_REQUIRED: &str = "kubeconfig, namespace and pod are required";

async fn logs_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LogsRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let req = body(payload, LOGS_REQUIRED)?;
    let (Some(kubeconfig), Some(namespace), Some(pod)) = (
        required(&req.kubeconfig),
        required(&req.namespace),
        required(&req.pod),
    ) else {
        return Err(Error::validation(LOGS_REQUIRED));
    };

    let client = k8s::client_from_kubeconfig(kubeconfig, &state.timeouts).await?;
    let params = LogParams {
        container: required(&req.container).map(str::to_string),
        ..LogParams::default()
    };
    let logs = k8s::pod_logs(client, namespace, pod, &params).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], logs))
}
