use std::net::SocketAddr;

use anyhow::{Context, Result, bail};

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_CHART_PATH: &str = "../store-chart";
pub const DEFAULT_STORE_DOMAIN: &str = "localtest.me";
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterMode {
    /// Shell out to `kubectl` and `helm`.
    Kubectl,
    /// Keep namespaces in process memory; nothing touches a real cluster.
    Memory,
}

impl ClusterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kubectl => "kubectl",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    pub bind_addr: SocketAddr,
    pub chart_path: String,
    pub store_domain: String,
    pub cluster_mode: ClusterMode,
    pub cors_origins: Vec<String>,
}

impl ProvisionerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("PROVISIONER_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .context("PROVISIONER_BIND must be a socket address")?;

        let cluster_mode = match lookup("PROVISIONER_CLUSTER").as_deref() {
            None | Some("") | Some("kubectl") => ClusterMode::Kubectl,
            Some("memory") => ClusterMode::Memory,
            Some(other) => bail!("unknown PROVISIONER_CLUSTER '{other}' (expected kubectl or memory)"),
        };

        let cors_origins = match lookup("PROVISIONER_CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(ToString::to_string).collect(),
        };

        Ok(Self {
            bind_addr,
            chart_path: lookup("PROVISIONER_CHART_PATH")
                .unwrap_or_else(|| DEFAULT_CHART_PATH.to_string()),
            store_domain: lookup("PROVISIONER_STORE_DOMAIN")
                .unwrap_or_else(|| DEFAULT_STORE_DOMAIN.to_string()),
            cluster_mode,
            cors_origins,
        })
    }
}
