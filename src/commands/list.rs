use colored::*;
use kube::Client;

use crate::k8s;
use crate::models::ResourceType;
use crate::utils;

pub async fn run(
    client: Client,
    resource_type: ResourceType,
    namespace: Option<String>,
) -> anyhow::Result<()> {
    let pb = utils::create_spinner("Fetching resources...");
    let rows = k8s::list_resources(client, resource_type, namespace.as_deref()).await;
    pb.finish_and_clear();
    let rows = rows?;

    if rows.is_empty() {
        println!("   {}", "(No resources found)".dimmed());
        return Ok(());
    }
    println!("{}", utils::rows_table(resource_type, &rows));
    Ok(())
}
