//! Apply executor.
//!
//! Each document gets one server-side-apply attempt and, if that fails, one
//! plain create. Documents are submitted one at a time in plan order so a
//! namespace or CRD exists before anything that needs it.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, GroupVersionKind, Patch, PatchParams, PostParams};
use kube::discovery::{self, ApiResource, Scope};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use crate::config::ApplySettings;
use crate::error::{Error, Result};
use crate::k8s::DEFAULT_NAMESPACE;
use crate::manifest::parse_manifests;
use crate::models::{ApplyOutcome, ApplyReport, ManifestDocument, OutcomeStatus, Verb};
use crate::order::order_documents;
use crate::report::ReportBuilder;

/// The two write calls the executor needs from the API server.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Server-side apply of the whole document.
    async fn apply(&self, document: &ManifestDocument) -> Result<()>;

    /// Plain create; fails if the object already exists.
    async fn create(&self, document: &ManifestDocument) -> Result<()>;
}

/// Both attempts failed; neither cause is dropped.
#[derive(Debug, thiserror::Error)]
#[error("{create}")]
pub struct FallbackError {
    pub apply: Error,
    pub create: Error,
}

/// Apply with create fallback, reporting which verb succeeded.
pub async fn try_apply(
    api: &dyn ResourceApi,
    document: &ManifestDocument,
) -> std::result::Result<Verb, FallbackError> {
    let apply = match api.apply(document).await {
        Ok(()) => return Ok(Verb::Apply),
        Err(e) => e,
    };
    debug!(
        kind = %document.kind,
        name = %document.name,
        error = %apply,
        "Server-side apply failed, falling back to create"
    );
    match api.create(document).await {
        Ok(()) => Ok(Verb::Create),
        Err(create) => Err(FallbackError { apply, create }),
    }
}

/// Submit one document and describe what happened.
pub async fn apply(api: &dyn ResourceApi, document: &ManifestDocument) -> ApplyOutcome {
    match try_apply(api, document).await {
        Ok(verb) => ApplyOutcome::success(document, verb),
        Err(FallbackError { apply, create }) => {
            warn!(
                kind = %document.kind,
                name = %document.name,
                apply_error = %apply,
                create_error = %create,
                "Failed to apply manifest"
            );
            ApplyOutcome {
                verb: Verb::Create,
                status: OutcomeStatus::Error,
                detail: Some(create.to_string()),
                apply_error: Some(apply.to_string()),
                ..ApplyOutcome::success(document, Verb::Create)
            }
        }
    }
}

/// Parse, order and submit a multi-document manifest.
///
/// Per-document failures land in the report; only malformed YAML or
/// cancellation fail the call. Cancelling stops before the next document
/// and abandons the one in flight; nothing already applied is undone.
pub async fn apply_manifest(
    api: &dyn ResourceApi,
    manifest: &str,
    cancel: &CancellationToken,
) -> Result<ApplyReport> {
    let docs = parse_manifests(manifest)?;
    let mut report = ReportBuilder::for_documents(&docs);
    debug!(
        documents = docs.len(),
        pending = report.pending(),
        "Submitting manifest documents"
    );

    for planned in order_documents(&docs) {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = apply(api, planned.document) => outcome,
        };
        report.record(planned.index, outcome);
    }

    let report = report.finish().ok_or(Error::Cancelled)?;
    info!(
        documents = report.len(),
        failed = report.failures(),
        "Applied manifest batch"
    );
    Ok(report)
}

/// Endpoint for one group/version/kind. `namespaced` is `None` when the
/// kind was not in discovery and the scope has to be guessed per document.
#[derive(Clone)]
struct Resolved {
    resource: ApiResource,
    namespaced: Option<bool>,
}

/// [`ResourceApi`] backed by a live cluster.
pub struct KubeResourceApi {
    client: Client,
    settings: ApplySettings,
    resolved: Mutex<HashMap<(String, String), Resolved>>,
}

impl KubeResourceApi {
    pub fn new(client: Client, settings: ApplySettings) -> Self {
        Self {
            client,
            settings,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Endpoint for a document. Discovery runs at most once per kind, so
    /// the create fallback reuses what the apply attempt resolved.
    async fn api_for(&self, document: &ManifestDocument) -> Api<DynamicObject> {
        let key = (document.api_version.clone(), document.kind.to_string());
        let cached = self
            .resolved
            .lock()
            .ok()
            .and_then(|cache| cache.get(&key).cloned());
        let resolved = match cached {
            Some(hit) => hit,
            None => {
                let resolved = self.discover(document).await;
                if let Ok(mut cache) = self.resolved.lock() {
                    cache.insert(key, resolved.clone());
                }
                resolved
            }
        };

        let namespaced = resolved
            .namespaced
            .unwrap_or(document.namespace.is_some());
        if namespaced {
            let ns = document.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
            Api::namespaced_with(self.client.clone(), ns, &resolved.resource)
        } else {
            Api::all_with(self.client.clone(), &resolved.resource)
        }
    }

    /// Kinds unknown to discovery (e.g. a CRD created moments ago) fall back
    /// to a guessed plural.
    async fn discover(&self, document: &ManifestDocument) -> Resolved {
        let (group, version) = document.group_version();
        let gvk = GroupVersionKind::gvk(group, version, document.kind.as_str());

        match discovery::pinned_kind(&self.client, &gvk).await {
            Ok((resource, caps)) => Resolved {
                resource,
                namespaced: Some(matches!(caps.scope, Scope::Namespaced)),
            },
            Err(e) => {
                debug!(
                    api_version = %document.api_version,
                    kind = %document.kind,
                    error = %e,
                    "Kind not found in discovery, using fallback pluralization"
                );
                let plural = pluralize_kind(document.kind.as_str());
                Resolved {
                    resource: ApiResource::from_gvk_with_plural(&gvk, &plural),
                    namespaced: None,
                }
            }
        }
    }
}

#[async_trait]
impl ResourceApi for KubeResourceApi {
    #[instrument(skip(self, document), fields(kind = %document.kind, name = %document.name))]
    async fn apply(&self, document: &ManifestDocument) -> Result<()> {
        let api = self.api_for(document).await;
        let mut params = PatchParams::apply(&self.settings.field_manager);
        if self.settings.force_conflicts {
            params = params.force();
        }
        api.patch(&document.name, &params, &Patch::Apply(&document.payload))
            .await?;
        debug!("Applied");
        Ok(())
    }

    #[instrument(skip(self, document), fields(kind = %document.kind, name = %document.name))]
    async fn create(&self, document: &ManifestDocument) -> Result<()> {
        let api = self.api_for(document).await;
        let object: DynamicObject = serde_json::from_value(document.payload.clone())
            .map_err(|e| Error::Cluster(format!("cannot encode {}: {}", document.kind, e)))?;
        let params = PostParams {
            field_manager: Some(self.settings.field_manager.clone()),
            ..PostParams::default()
        };
        api.create(&params, &object).await?;
        debug!("Created");
        Ok(())
    }
}

/// Best-effort plural for kinds discovery does not know yet.
fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") || lower.ends_with('x') {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}
