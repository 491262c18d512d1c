use std::io::Read;
use std::path::Path;

use anyhow::{Context, bail};
use colored::*;
use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::apply::{KubeResourceApi, apply_manifest};
use crate::config::ApplySettings;
use crate::utils;

pub async fn run(client: Client, file: &Path, settings: ApplySettings) -> anyhow::Result<()> {
    let manifest = read_manifest(file)?;
    let api = KubeResourceApi::new(client, settings);

    // Ctrl-C stops the batch before the next document.
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let pb = utils::create_spinner("Applying manifests...");
    let result = apply_manifest(&api, &manifest, &cancel).await;
    pb.finish_and_clear();
    ctrl_c.abort();

    let report = result?;
    if report.is_empty() {
        println!("{}", "No documents to apply".yellow());
        return Ok(());
    }
    println!("{}", utils::report_table(&report));

    let failed = report.failures();
    if failed > 0 {
        bail!("{failed} of {} documents failed", report.len());
    }
    println!("{} {} documents applied", "✔".green(), report.len());
    Ok(())
}

fn read_manifest(file: &Path) -> anyhow::Result<String> {
    if file == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read manifest from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}
