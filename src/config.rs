use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;

/// How documents are submitted with server-side apply.
#[derive(Debug, Clone, Args)]
pub struct ApplySettings {
    /// Field manager recorded as owner of applied fields
    #[arg(long, env = "KUBEDECK_FIELD_MANAGER", default_value = "kubedeck")]
    pub field_manager: String,
    /// Take over fields owned by other managers instead of falling back to create
    #[arg(long, env = "KUBEDECK_FORCE_CONFLICTS", default_value_t = false)]
    pub force_conflicts: bool,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            field_manager: "kubedeck".to_string(),
            force_conflicts: false,
        }
    }
}

/// Timeouts for every client built from a kubeconfig.
#[derive(Debug, Clone, Copy, Args)]
pub struct ClientTimeouts {
    /// Seconds to wait for a connection to the API server
    #[arg(long, global = true, env = "KUBEDECK_CONNECT_TIMEOUT", default_value_t = 10)]
    pub connect_timeout: u64,
    /// Seconds to wait for an API server response
    #[arg(long, global = true, env = "KUBEDECK_READ_TIMEOUT", default_value_t = 60)]
    pub read_timeout: u64,
}

impl ClientTimeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            read_timeout: 60,
        }
    }
}

/// Settings for `kubedeck serve`.
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address the HTTP service listens on
    #[arg(long, env = "KUBEDECK_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,
    /// Seconds an apply batch may run before it is cancelled
    #[arg(long, env = "KUBEDECK_REQUEST_TIMEOUT", default_value_t = 120)]
    pub request_timeout: u64,
    /// Largest accepted request body in bytes
    #[arg(long, env = "KUBEDECK_BODY_LIMIT", default_value_t = 4 * 1024 * 1024)]
    pub body_limit: usize,
    #[command(flatten)]
    pub apply: ApplySettings,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        server: ServerConfig,
        #[command(flatten)]
        timeouts: ClientTimeouts,
    }

    #[test]
    fn defaults() {
        let h = Harness::try_parse_from(["kubedeck"]).unwrap();
        assert_eq!(h.server.listen, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(h.server.request_timeout(), Duration::from_secs(120));
        assert_eq!(h.server.apply.field_manager, "kubedeck");
        assert!(!h.server.apply.force_conflicts);
        assert_eq!(h.timeouts.connect(), Duration::from_secs(10));
    }

    #[test]
    fn flags_override_defaults() {
        let h = Harness::try_parse_from([
            "kubedeck",
            "--listen",
            "127.0.0.1:8080",
            "--field-manager",
            "ci",
            "--force-conflicts",
            "--read-timeout",
            "5",
        ])
        .unwrap();
        assert_eq!(h.server.listen.port(), 8080);
        assert_eq!(h.server.apply.field_manager, "ci");
        assert!(h.server.apply.force_conflicts);
        assert_eq!(h.timeouts.read(), Duration::from_secs(5));
    }
}
