use crate::k8s;
use crate::models::PodOption;
use crate::utils;
use anyhow::bail;
use colored::*;
use futures::{AsyncBufReadExt, StreamExt};
use inquire::Select;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client, api::LogParams};
use regex::Regex;

pub struct LogOptions {
    pub container: Option<String>,
    pub follow: bool,
    pub tail: Option<i64>,
    pub previous: bool,
    pub filter: Option<String>,
    pub exclude: Option<String>,
}

pub async fn run(
    client: Client,
    namespace: String,
    pod_arg: Option<String>,
    opts: LogOptions,
) -> anyhow::Result<()> {
    let lines = LineFilter::new(opts.filter.as_deref(), opts.exclude.as_deref())?;

    let target = match pod_arg {
        Some(name) => PodOption { name, namespace, containers: vec![] },
        None => {
            let pods = utils::fetch_pods(client.clone(), &namespace).await?;
            if pods.is_empty() {
                bail!("no pods found in namespace {namespace}");
            }
            Select::new("Select pod:", pods).prompt()?
        }
    };

    let container = match opts.container {
        Some(c) => Some(c),
        None if target.containers.len() > 1 => Some(
            Select::new(&format!("Select container for {}:", target.name), target.containers.clone())
                .prompt()?,
        ),
        None => None,
    };

    let params = LogParams {
        follow: opts.follow,
        tail_lines: opts.tail,
        container,
        previous: opts.previous,
        ..LogParams::default()
    };

    if opts.follow {
        return stream_logs(client, &target, &params, &lines).await;
    }

    let text = k8s::pod_logs(client, &target.namespace, &target.name, &params).await?;
    for line in text.lines().filter(|l| lines.keeps(l)) {
        println!("{line}");
    }
    Ok(())
}

// --- STREAMING LOGIC ---
async fn stream_logs(
    client: Client,
    pod: &PodOption,
    params: &LogParams,
    lines: &LineFilter,
) -> anyhow::Result<()> {
    let pods: Api<Pod> = Api::namespaced(client, &pod.namespace);
    let log_stream = pods.log_stream(&pod.name, params).await?;
    let mut stream = log_stream.lines();

    let prefix_text = match &params.container {
        Some(container) => format!("[{}/{}]", pod.name, container),
        None => format!("[{}]", pod.name),
    };
    let prefix = match pod.name.len() % 4 {
        0 => prefix_text.cyan(),
        1 => prefix_text.green(),
        2 => prefix_text.magenta(),
        _ => prefix_text.yellow(),
    }
    .bold();

    println!("\n--- Streaming Logs ---\n");
    while let Some(line) = stream.next().await {
        let line = line?;
        if lines.keeps(&line) {
            println!("{} {}", prefix, line);
        }
    }
    Ok(())
}

/// Keeps lines matching `filter` (when set) and not matching `exclude`.
struct LineFilter {
    filter: Option<Regex>,
    exclude: Option<Regex>,
}

impl LineFilter {
    fn new(filter: Option<&str>, exclude: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            filter: filter.map(Regex::new).transpose()?,
            exclude: exclude.map(Regex::new).transpose()?,
        })
    }

    fn keeps(&self, line: &str) -> bool {
        if let Some(re) = &self.exclude {
            if re.is_match(line) {
                return false;
            }
        }
        self.filter.as_ref().is_none_or(|re| re.is_match(line))
    }
}
