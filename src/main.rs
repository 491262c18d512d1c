mod apply;
mod commands;
mod config;
mod error;
#[cfg(test)]
mod fake_api;
mod k8s;
mod manifest;
mod models;
mod order;
mod report;
mod server;
pub mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::{ApplySettings, ClientTimeouts, ServerConfig};
use models::{DeletableKind, ResourceType};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "kubedeck", about = "Apply manifests and manage workloads on a Kubernetes cluster", author, version, long_about = None)]
struct Cli {
    /// Kubeconfig file to use instead of the inferred context
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    #[command(flatten)]
    timeouts: ClientTimeouts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service; every request brings its own kubeconfig
    Serve(ServerConfig),
    /// Apply a multi-document YAML manifest (server-side apply, create fallback)
    Apply {
        /// Manifest file, or "-" for stdin
        #[arg(short, long)]
        file: PathBuf,
        #[command(flatten)]
        settings: ApplySettings,
    },
    /// List namespaces, deployments, pods, services, configmaps or secrets
    List {
        /// One of: namespaces, deployments, pods, services, configmaps, secrets
        resource_type: ResourceType,
        /// Target namespace (defaults to "default")
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Set the replica count of a deployment
    Scale {
        /// Deployment name
        name: String,
        #[arg(short, long)]
        replicas: i32,
        #[arg(short, long, default_value = k8s::DEFAULT_NAMESPACE)]
        namespace: String,
    },
    /// Delete a Deployment, Service, ConfigMap, Secret, Pod or Namespace
    Delete {
        kind: DeletableKind,
        name: String,
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Print or tail a pod's logs
    Logs {
        /// Target pod name (optional, will show menu if missing)
        #[arg(short, long)]
        pod: Option<String>,
        #[arg(short, long, default_value = k8s::DEFAULT_NAMESPACE)]
        namespace: String,
        /// Container to read (asks when the pod has several and none is given)
        #[arg(short, long)]
        container: Option<String>,
        /// Keep streaming new lines
        #[arg(short = 'F', long, default_value_t = false)]
        follow: bool,
        /// Only return the last N lines
        #[arg(long)]
        tail: Option<i64>,
        /// Read the previous terminated container's logs
        #[arg(long, default_value_t = false)]
        previous: bool,
        /// Only show lines matching this regex
        #[arg(short, long)]
        filter: Option<String>,
        /// Hide lines matching this regex (e.g. -e "healthz")
        #[arg(short, long)]
        exclude: Option<String>,
    },
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli { kubeconfig, timeouts, command } = Cli::parse();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let command = match command {
        Commands::Serve(config) => {
            init_tracing("kubedeck=info,tower_http=info");
            return server::serve(config, timeouts).await;
        }
        other => other,
    };
    init_tracing("warn");

    let pb = utils::create_spinner("Initializing Kubernetes client...");
    let client = k8s::client_from_path(kubeconfig.as_deref(), &timeouts).await;
    pb.finish_and_clear();
    let client = client?;

    match command {
        Commands::Serve(_) => {}
        Commands::Apply { file, settings } => {
            commands::apply::run(client, &file, settings).await?;
        }
        Commands::List { resource_type, namespace } => {
            commands::list::run(client, resource_type, namespace).await?;
        }
        Commands::Scale { name, replicas, namespace } => {
            commands::scale::run(client, &namespace, &name, replicas).await?;
        }
        Commands::Delete { kind, name, namespace } => {
            commands::delete::run(client, kind, &name, namespace).await?;
        }
        Commands::Logs { pod, namespace, container, follow, tail, previous, filter, exclude } => {
            let opts = commands::log::LogOptions { container, follow, tail, previous, filter, exclude };
            commands::log::run(client, namespace, pod, opts).await?;
        }
    }
    Ok(())
}
