use crate::models::{ApplyReport, OutcomeStatus, PodOption, ResourceType, Row};
use colored::*;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client, api::ListParams};

// --- SHARED SPINNER ---
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

// --- POD PICKER ---
pub async fn fetch_pods(client: Client, namespace: &str) -> anyhow::Result<Vec<PodOption>> {
    let pb = create_spinner("Fetching pods...");
    let api: Api<Pod> = Api::namespaced(client, namespace);
    let list = api.list(&ListParams::default()).await;
    pb.finish_and_clear();

    Ok(list?
        .items
        .into_iter()
        .map(|p| PodOption {
            name: p.metadata.name.unwrap_or_default(),
            namespace: namespace.to_string(),
            containers: p
                .spec
                .map(|s| s.containers.into_iter().map(|c| c.name).collect())
                .unwrap_or_default(),
        })
        .collect())
}

// --- TABLES ---
pub fn rows_table(resource_type: ResourceType, rows: &[Row]) -> Table {
    let mut table = Table::new();
    table.set_header(resource_type.headers().to_vec());
    for row in rows {
        table.add_row(row.cells());
    }
    table
}

pub fn report_table(report: &ApplyReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Kind", "Name", "Namespace", "Verb", "Status", "Detail"]);
    for o in report.outcomes() {
        let status = match o.status {
            OutcomeStatus::Success => "success".green(),
            OutcomeStatus::Error => "error".red(),
        };
        let detail = match (&o.detail, &o.apply_error) {
            (Some(create), Some(apply)) => format!("{create} (apply: {apply})"),
            (Some(detail), None) => detail.clone(),
            _ => String::new(),
        };
        table.add_row(vec![
            o.kind.clone().unwrap_or_default(),
            o.name.clone().unwrap_or_default(),
            o.namespace.clone().unwrap_or_default(),
            o.verb.to_string(),
            status.to_string(),
            detail,
        ]);
    }
    table
}
