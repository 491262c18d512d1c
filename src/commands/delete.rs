use colored::*;
use kube::Client;

use crate::k8s;
use crate::models::DeletableKind;

pub async fn run(
    client: Client,
    kind: DeletableKind,
    name: &str,
    namespace: Option<String>,
) -> anyhow::Result<()> {
    k8s::delete_resource(client, kind, name, namespace.as_deref()).await?;
    println!("{} {} {} deleted", "✔".green(), kind, name.bold());
    Ok(())
}
