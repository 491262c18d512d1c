use colored::*;
use kube::Client;

use crate::k8s;

pub async fn run(client: Client, namespace: &str, name: &str, replicas: i32) -> anyhow::Result<()> {
    let desired = k8s::scale_deployment(client, namespace, name, replicas).await?;
    let shown = desired.map_or_else(|| "unknown".to_string(), |r| r.to_string());
    println!(
        "{} deployment {}/{} scaled to {} replicas",
        "✔".green(),
        namespace,
        name.bold(),
        shown.cyan()
    );
    Ok(())
}
