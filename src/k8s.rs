//! Cluster access: per-request client construction and the single-call
//! passthroughs (list, scale, delete, logs).

use std::fmt::Debug;
use std::path::Path;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod, Secret, Service};
use kube::api::{Api, DeleteParams, ListParams, LogParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ClientTimeouts;
use crate::error::{Error, Result};
use crate::models::{
    ConfigMapRow, DeletableKind, DeploymentRow, NamespaceRow, PodRow, ResourceType, Row,
    SecretRow, ServiceRow,
};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Build a client from kubeconfig text supplied with a request.
///
/// The client is owned by the caller and dropped with the request.
pub async fn client_from_kubeconfig(yaml: &str, timeouts: &ClientTimeouts) -> Result<Client> {
    let kubeconfig = Kubeconfig::from_yaml(yaml).map_err(|e| Error::Kubeconfig(e.to_string()))?;
    client_from(kubeconfig, timeouts).await
}

/// Build a client from a kubeconfig file, or infer one from the
/// environment (KUBECONFIG, ~/.kube/config, in-cluster) when no path is given.
pub async fn client_from_path(path: Option<&Path>, timeouts: &ClientTimeouts) -> Result<Client> {
    match path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::Kubeconfig(format!("failed to read {}: {}", path.display(), e))
            })?;
            client_from(kubeconfig, timeouts).await
        }
        None => {
            let mut config = Config::infer()
                .await
                .map_err(|e| Error::Kubeconfig(e.to_string()))?;
            apply_timeouts(&mut config, timeouts);
            Client::try_from(config).map_err(|e| Error::Kubeconfig(e.to_string()))
        }
    }
}

async fn client_from(kubeconfig: Kubeconfig, timeouts: &ClientTimeouts) -> Result<Client> {
    let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::Kubeconfig(e.to_string()))?;
    apply_timeouts(&mut config, timeouts);
    Client::try_from(config).map_err(|e| Error::Kubeconfig(e.to_string()))
}

fn apply_timeouts(config: &mut Config, timeouts: &ClientTimeouts) {
    config.connect_timeout = Some(timeouts.connect());
    config.read_timeout = Some(timeouts.read());
}

// --- LIST ---

pub async fn list_resources(
    client: Client,
    resource_type: ResourceType,
    namespace: Option<&str>,
) -> Result<Vec<Row>> {
    let ns = namespace.unwrap_or(DEFAULT_NAMESPACE);
    let lp = ListParams::default();
    debug!(?resource_type, namespace = ns, "Listing resources");

    let rows = match resource_type {
        ResourceType::Namespaces => {
            let api: Api<Namespace> = Api::all(client);
            api.list(&lp).await?.items.iter().map(namespace_row).collect()
        }
        ResourceType::Deployments => {
            let api: Api<Deployment> = Api::namespaced(client, ns);
            api.list(&lp).await?.items.iter().map(deployment_row).collect()
        }
        ResourceType::Pods => {
            let api: Api<Pod> = Api::namespaced(client, ns);
            api.list(&lp).await?.items.iter().map(pod_row).collect()
        }
        ResourceType::Services => {
            let api: Api<Service> = Api::namespaced(client, ns);
            api.list(&lp).await?.items.iter().map(service_row).collect()
        }
        ResourceType::Configmaps => {
            let api: Api<ConfigMap> = Api::namespaced(client, ns);
            api.list(&lp).await?.items.iter().map(config_map_row).collect()
        }
        ResourceType::Secrets => {
            let api: Api<Secret> = Api::namespaced(client, ns);
            api.list(&lp).await?.items.iter().map(secret_row).collect()
        }
    };
    Ok(rows)
}

fn namespace_row(n: &Namespace) -> Row {
    Row::Namespace(NamespaceRow {
        name: n.metadata.name.clone(),
        status: n.status.as_ref().and_then(|s| s.phase.clone()),
    })
}

fn deployment_row(d: &Deployment) -> Row {
    let status = d.status.as_ref();
    let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
    let desired = status.and_then(|s| s.replicas).unwrap_or(0);
    Row::Deployment(DeploymentRow {
        name: d.metadata.name.clone(),
        namespace: d.metadata.namespace.clone(),
        ready: format!("{ready}/{desired}"),
        available: status.and_then(|s| s.available_replicas).unwrap_or(0),
    })
}

fn pod_row(p: &Pod) -> Row {
    Row::Pod(PodRow {
        name: p.metadata.name.clone(),
        namespace: p.metadata.namespace.clone(),
        phase: p.status.as_ref().and_then(|s| s.phase.clone()),
        node: p.spec.as_ref().and_then(|s| s.node_name.clone()),
    })
}

fn service_row(s: &Service) -> Row {
    let spec = s.spec.as_ref();
    Row::Service(ServiceRow {
        name: s.metadata.name.clone(),
        namespace: s.metadata.namespace.clone(),
        type_: spec.and_then(|s| s.type_.clone()),
        cluster_ip: spec.and_then(|s| s.cluster_ip.clone()),
    })
}

fn config_map_row(c: &ConfigMap) -> Row {
    Row::ConfigMap(ConfigMapRow {
        name: c.metadata.name.clone(),
        namespace: c.metadata.namespace.clone(),
    })
}

fn secret_row(s: &Secret) -> Row {
    Row::Secret(SecretRow {
        name: s.metadata.name.clone(),
        namespace: s.metadata.namespace.clone(),
        type_: s.type_.clone(),
    })
}

// --- SCALE ---

/// Set a deployment's replica count and return the count read back.
pub async fn scale_deployment(
    client: Client,
    namespace: &str,
    name: &str,
    replicas: i32,
) -> Result<Option<i32>> {
    if replicas < 0 {
        return Err(Error::validation("replicas must be a non-negative integer"));
    }
    let api: Api<Deployment> = Api::namespaced(client, namespace);
    let patch = serde_json::json!({ "spec": { "replicas": replicas } });
    api.patch_scale(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    let scale = api.get_scale(name).await?;
    info!(namespace, name, replicas, "Scaled deployment");
    Ok(scale.spec.and_then(|s| s.replicas))
}

// --- DELETE ---

pub async fn delete_resource(
    client: Client,
    kind: DeletableKind,
    name: &str,
    namespace: Option<&str>,
) -> Result<()> {
    let ns = namespace.unwrap_or(DEFAULT_NAMESPACE);
    match kind {
        DeletableKind::Deployment => delete(Api::<Deployment>::namespaced(client, ns), name).await?,
        DeletableKind::Service => delete(Api::<Service>::namespaced(client, ns), name).await?,
        DeletableKind::ConfigMap => delete(Api::<ConfigMap>::namespaced(client, ns), name).await?,
        DeletableKind::Secret => delete(Api::<Secret>::namespaced(client, ns), name).await?,
        DeletableKind::Pod => delete(Api::<Pod>::namespaced(client, ns), name).await?,
        DeletableKind::Namespace => delete(Api::<Namespace>::all(client), name).await?,
    }
    info!(%kind, name, "Deleted resource");
    Ok(())
}

async fn delete<K>(api: Api<K>, name: &str) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    api.delete(name, &DeleteParams::default()).await?;
    Ok(())
}

// --- LOGS ---

pub async fn pod_logs(client: Client, namespace: &str, pod: &str, params: &LogParams) -> Result<String> {
    let api: Api<Pod> = Api::namespaced(client, namespace);
    debug!(namespace, pod, container = ?params.container, "Fetching pod logs");
    Ok(api.logs(pod, params).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use k8s_openapi::api::apps::v1::DeploymentStatus;
    use k8s_openapi::api::core::v1::{NamespaceStatus, PodSpec, PodStatus, ServiceSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;

    use crate::fake_api;

    fn meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: namespace.map(str::to_string),
            ..ObjectMeta::default()
        }
    }

    #[test]
    fn deployment_row_counts_default_to_zero() {
        let bare = Deployment {
            metadata: meta("web", Some("prod")),
            ..Deployment::default()
        };
        let Row::Deployment(row) = deployment_row(&bare) else {
            panic!("expected deployment row");
        };
        assert_eq!(row.ready, "0/0");
        assert_eq!(row.available, 0);

        let running = Deployment {
            metadata: meta("web", Some("prod")),
            status: Some(DeploymentStatus {
                replicas: Some(3),
                ready_replicas: Some(2),
                available_replicas: Some(2),
                ..DeploymentStatus::default()
            }),
            ..Deployment::default()
        };
        let json = serde_json::to_value(deployment_row(&running)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "web", "namespace": "prod", "ready": "2/3", "available": 2})
        );
    }

    #[test]
    fn pod_row_reads_phase_and_node() {
        let pod = Pod {
            metadata: meta("api-0", Some("default")),
            spec: Some(PodSpec {
                node_name: Some("node-a".into()),
                ..PodSpec::default()
            }),
            status: Some(PodStatus {
                phase: Some("Running".into()),
                ..PodStatus::default()
            }),
            ..Pod::default()
        };
        assert_eq!(
            pod_row(&pod).cells(),
            vec!["api-0", "default", "Running", "node-a"]
        );
    }

    #[test]
    fn namespace_and_service_rows() {
        let ns = Namespace {
            metadata: meta("demo", None),
            status: Some(NamespaceStatus {
                phase: Some("Active".into()),
                ..NamespaceStatus::default()
            }),
            ..Namespace::default()
        };
        assert_eq!(
            serde_json::to_value(namespace_row(&ns)).unwrap(),
            serde_json::json!({"name": "demo", "status": "Active"})
        );

        let svc = Service {
            metadata: meta("web", Some("default")),
            spec: Some(ServiceSpec {
                type_: Some("ClusterIP".into()),
                cluster_ip: Some("10.96.0.10".into()),
                ..ServiceSpec::default()
            }),
            ..Service::default()
        };
        assert_eq!(service_row(&svc).cells()[3], "10.96.0.10");
    }

    #[test]
    fn secret_and_config_map_rows() {
        let secret = Secret {
            metadata: meta("token", Some("default")),
            type_: Some("Opaque".into()),
            ..Secret::default()
        };
        assert_eq!(secret_row(&secret).cells(), vec!["token", "default", "Opaque"]);

        let cm = ConfigMap {
            metadata: meta("cfg", Some("demo")),
            ..ConfigMap::default()
        };
        assert_eq!(config_map_row(&cm).cells(), vec!["cfg", "demo"]);
    }

    #[tokio::test]
    async fn garbage_kubeconfig_is_rejected_before_any_call() {
        let Err(err) =
            client_from_kubeconfig("::not a kubeconfig::", &ClientTimeouts::default()).await
        else {
            panic!("expected kubeconfig error");
        };
        assert!(matches!(err, Error::Kubeconfig(_)));
    }

    #[tokio::test]
    async fn scale_patches_the_subresource_then_reads_it_back() {
        let (client, mut handle) = fake_api::client();
        let server = tokio::spawn(async move {
            let scale = json!({
                "apiVersion": "autoscaling/v1",
                "kind": "Scale",
                "metadata": {"name": "web", "namespace": "prod"},
                "spec": {"replicas": 3},
                "status": {"replicas": 2},
            });
            let patch = fake_api::reply(&mut handle, StatusCode::OK, scale.clone()).await;
            let get = fake_api::reply(&mut handle, StatusCode::OK, scale).await;
            (patch, get)
        });

        let replicas = scale_deployment(client, "prod", "web", 3).await.unwrap();
        assert_eq!(replicas, Some(3));

        let (patch, get) = server.await.unwrap();
        assert_eq!(patch.method, Method::PATCH);
        assert_eq!(patch.path, "/apis/apps/v1/namespaces/prod/deployments/web/scale");
        assert_eq!(
            patch.content_type.as_deref(),
            Some("application/merge-patch+json")
        );
        assert_eq!(patch.body, json!({"spec": {"replicas": 3}}));
        assert_eq!(get.method, Method::GET);
        assert_eq!(get.path, patch.path);
    }

    #[tokio::test]
    async fn negative_scale_never_reaches_the_cluster() {
        let (client, _handle) = fake_api::client();
        let err = scale_deployment(client, "prod", "web", -1).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn namespace_delete_is_cluster_scoped() {
        let (client, mut handle) = fake_api::client();
        let server = tokio::spawn(async move {
            fake_api::reply(
                &mut handle,
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "Namespace",
                    "metadata": {"name": "demo"},
                    "status": {"phase": "Terminating"},
                }),
            )
            .await
        });

        delete_resource(client, DeletableKind::Namespace, "demo", Some("ignored"))
            .await
            .unwrap();

        let seen = server.await.unwrap();
        assert_eq!(seen.method, Method::DELETE);
        assert_eq!(seen.path, "/api/v1/namespaces/demo");
    }

    #[tokio::test]
    async fn delete_defaults_to_the_default_namespace() {
        let (client, mut handle) = fake_api::client();
        let server = tokio::spawn(async move {
            fake_api::reply(
                &mut handle,
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "Pod",
                    "metadata": {"name": "api-0", "namespace": "default"},
                }),
            )
            .await
        });

        delete_resource(client, DeletableKind::Pod, "api-0", None)
            .await
            .unwrap();

        let seen = server.await.unwrap();
        assert_eq!(seen.method, Method::DELETE);
        assert_eq!(seen.path, "/api/v1/namespaces/default/pods/api-0");
    }

    #[tokio::test]
    async fn delete_surfaces_cluster_rejection() {
        let (client, mut handle) = fake_api::client();
        let server = tokio::spawn(async move {
            fake_api::reply(
                &mut handle,
                StatusCode::NOT_FOUND,
                fake_api::status(404, "NotFound", "secrets \"token\" not found"),
            )
            .await
        });

        let err = delete_resource(client, DeletableKind::Secret, "token", Some("prod"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cluster(_)));
        assert_eq!(server.await.unwrap().path, "/api/v1/namespaces/prod/secrets/token");
    }

    #[tokio::test]
    async fn list_defaults_to_the_default_namespace() {
        let (client, mut handle) = fake_api::client();
        let server = tokio::spawn(async move {
            fake_api::reply(
                &mut handle,
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "ConfigMapList",
                    "metadata": {"resourceVersion": "1"},
                    "items": [{
                        "apiVersion": "v1",
                        "kind": "ConfigMap",
                        "metadata": {"name": "cfg", "namespace": "default"},
                    }],
                }),
            )
            .await
        });

        let rows = list_resources(client, ResourceType::Configmaps, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells(), vec!["cfg", "default"]);

        let seen = server.await.unwrap();
        assert_eq!(seen.method, Method::GET);
        assert_eq!(seen.path, "/api/v1/namespaces/default/configmaps");
    }

    #[tokio::test]
    async fn namespaces_are_listed_cluster_wide() {
        let (client, mut handle) = fake_api::client();
        let server = tokio::spawn(async move {
            fake_api::reply(
                &mut handle,
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "NamespaceList",
                    "metadata": {"resourceVersion": "1"},
                    "items": [{
                        "apiVersion": "v1",
                        "kind": "Namespace",
                        "metadata": {"name": "kube-system"},
                        "status": {"phase": "Active"},
                    }],
                }),
            )
            .await
        });

        let rows = list_resources(client, ResourceType::Namespaces, Some("prod"))
            .await
            .unwrap();
        assert_eq!(rows[0].cells(), vec!["kube-system", "Active"]);
        assert_eq!(server.await.unwrap().path, "/api/v1/namespaces");
    }

    #[tokio::test]
    async fn logs_pass_container_and_tail() {
        let (client, mut handle) = fake_api::client();
        let server = tokio::spawn(async move {
            fake_api::reply_raw(&mut handle, StatusCode::OK, b"line one\nline two\n".to_vec()).await
        });

        let params = LogParams {
            container: Some("app".into()),
            tail_lines: Some(10),
            ..LogParams::default()
        };
        let text = pod_logs(client, "default", "api-0", &params).await.unwrap();
        assert_eq!(text, "line one\nline two\n");

        let seen = server.await.unwrap();
        assert_eq!(seen.method, Method::GET);
        assert_eq!(seen.path, "/api/v1/namespaces/default/pods/api-0/log");
        assert!(seen.query.contains("container=app"));
        assert!(seen.query.contains("tailLines=10"));
    }
}
