use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of a manifest document, with the kinds the orderer cares about
/// split out from everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Namespace,
    CustomResourceDefinition,
    Other(String),
}

impl ResourceKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "Namespace" => ResourceKind::Namespace,
            "CustomResourceDefinition" => ResourceKind::CustomResourceDefinition,
            other => ResourceKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Namespace => "Namespace",
            ResourceKind::CustomResourceDefinition => "CustomResourceDefinition",
            ResourceKind::Other(kind) => kind,
        }
    }

    /// Kinds other documents in the same batch may depend on.
    pub fn is_prerequisite(&self) -> bool {
        matches!(
            self,
            ResourceKind::Namespace | ResourceKind::CustomResourceDefinition
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated YAML document.
///
/// Only the fields the orderer and executor inspect are lifted out; the
/// decoded document is kept whole in `payload` and sent to the API server
/// as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    pub kind: ResourceKind,
    pub api_version: String,
    pub name: String,
    pub namespace: Option<String>,
    pub payload: serde_json::Value,
}

impl ManifestDocument {
    /// Split `apiVersion` into group and version; the core group is empty.
    pub fn group_version(&self) -> (&str, &str) {
        match self.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Apply,
    Create,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Apply => f.write_str("apply"),
            Verb::Create => f.write_str("create"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// Result of submitting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub verb: Verb,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Server-side-apply failure kept alongside `detail` when the create
    /// fallback failed too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_error: Option<String>,
}

impl ApplyOutcome {
    pub fn success(doc: &ManifestDocument, verb: Verb) -> Self {
        Self {
            kind: Some(doc.kind.to_string()),
            name: Some(doc.name.clone()),
            namespace: doc.namespace.clone(),
            verb,
            status: OutcomeStatus::Success,
            detail: None,
            apply_error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Outcomes of one apply batch, in input document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplyReport(Vec<ApplyOutcome>);

impl ApplyReport {
    pub(crate) fn new(outcomes: Vec<ApplyOutcome>) -> Self {
        Self(outcomes)
    }

    pub fn outcomes(&self) -> &[ApplyOutcome] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.0.iter().filter(|o| !o.is_success()).count()
    }
}

/// Resource collections the `list` operation knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Namespaces,
    Deployments,
    Pods,
    Services,
    Configmaps,
    Secrets,
}

impl ResourceType {
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            ResourceType::Namespaces => &["Name", "Status"],
            ResourceType::Deployments => &["Name", "Namespace", "Ready", "Available"],
            ResourceType::Pods => &["Name", "Namespace", "Phase", "Node"],
            ResourceType::Services => &["Name", "Namespace", "Type", "Cluster IP"],
            ResourceType::Configmaps => &["Name", "Namespace"],
            ResourceType::Secrets => &["Name", "Namespace", "Type"],
        }
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "namespaces" => Ok(ResourceType::Namespaces),
            "deployments" => Ok(ResourceType::Deployments),
            "pods" => Ok(ResourceType::Pods),
            "services" => Ok(ResourceType::Services),
            "configmaps" => Ok(ResourceType::Configmaps),
            "secrets" => Ok(ResourceType::Secrets),
            _ => Err(Error::validation(format!("Unsupported type: {s}"))),
        }
    }
}

/// Kinds the `delete` operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletableKind {
    Deployment,
    Service,
    ConfigMap,
    Secret,
    Pod,
    Namespace,
}

impl FromStr for DeletableKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deployment" => Ok(DeletableKind::Deployment),
            "service" => Ok(DeletableKind::Service),
            "configmap" => Ok(DeletableKind::ConfigMap),
            "secret" => Ok(DeletableKind::Secret),
            "pod" => Ok(DeletableKind::Pod),
            "namespace" => Ok(DeletableKind::Namespace),
            _ => Err(Error::validation(format!("Unsupported kind: {s}"))),
        }
    }
}

impl fmt::Display for DeletableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            DeletableKind::Deployment => "Deployment",
            DeletableKind::Service => "Service",
            DeletableKind::ConfigMap => "ConfigMap",
            DeletableKind::Secret => "Secret",
            DeletableKind::Pod => "Pod",
            DeletableKind::Namespace => "Namespace",
        };
        f.write_str(kind)
    }
}

// --- LIST ROWS ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceRow {
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentRow {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub ready: String,
    pub available: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodRow {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub phase: Option<String>,
    pub node: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRow {
    pub name: Option<String>,
    pub namespace: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    #[serde(rename = "clusterIP")]
    pub cluster_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigMapRow {
    pub name: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretRow {
    pub name: Option<String>,
    pub namespace: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

/// One display row of a `list` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Row {
    Namespace(NamespaceRow),
    Deployment(DeploymentRow),
    Pod(PodRow),
    Service(ServiceRow),
    ConfigMap(ConfigMapRow),
    Secret(SecretRow),
}

impl Row {
    /// Cell values in the order of [`ResourceType::headers`].
    pub fn cells(&self) -> Vec<String> {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        match self {
            Row::Namespace(r) => vec![text(&r.name), text(&r.status)],
            Row::Deployment(r) => vec![
                text(&r.name),
                text(&r.namespace),
                r.ready.clone(),
                r.available.to_string(),
            ],
            Row::Pod(r) => vec![text(&r.name), text(&r.namespace), text(&r.phase), text(&r.node)],
            Row::Service(r) => vec![
                text(&r.name),
                text(&r.namespace),
                text(&r.type_),
                text(&r.cluster_ip),
            ],
            Row::ConfigMap(r) => vec![text(&r.name), text(&r.namespace)],
            Row::Secret(r) => vec![text(&r.name), text(&r.namespace), text(&r.type_)],
        }
    }
}

/// A pod offered in the interactive log picker.
#[derive(Clone)]
pub struct PodOption {
    pub name: String,
    pub namespace: String,
    pub containers: Vec<String>,
}

impl fmt::Display for PodOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.namespace)
    }
}
