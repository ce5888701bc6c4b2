use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The command exited non-zero; carries its stderr, or stdout when stderr is empty.
    #[error("{0}")]
    Failed(String),
    #[error("unexpected output from {program}: {message}")]
    Parse { program: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodState {
    pub phase: String,
    pub containers_ready: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSpec {
    pub name: String,
    pub namespace: String,
    pub chart: String,
    pub timeout: String,
    pub values: Vec<(String, String)>,
}

/// Cluster operations needed to provision and inspect stores.
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<String>, CommandError>;

    async fn namespace_exists(&self, namespace: &str) -> bool;

    async fn namespace_label(
        &self,
        namespace: &str,
        label: &str,
    ) -> Result<Option<String>, CommandError>;

    async fn namespace_created_at(&self, namespace: &str) -> Result<Option<String>, CommandError>;

    async fn pods(&self, namespace: &str) -> Result<Vec<PodState>, CommandError>;

    async fn create_namespace(&self, namespace: &str) -> Result<(), CommandError>;

    async fn label_namespace(
        &self,
        namespace: &str,
        label: &str,
        value: &str,
    ) -> Result<(), CommandError>;

    async fn install_release(&self, release: &ReleaseSpec) -> Result<(), CommandError>;

    async fn uninstall_release(&self, name: &str, namespace: &str) -> Result<(), CommandError>;

    async fn delete_namespace(&self, namespace: &str) -> Result<(), CommandError>;
}

pub struct KubectlCluster {
    kubectl: String,
    helm: String,
}

impl Default for KubectlCluster {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            helm: "helm".to_string(),
        }
    }
}

impl KubectlCluster {
    async fn kubectl(&self, args: &[&str]) -> Result<String, CommandError> {
        run(&self.kubectl, args).await
    }

    async fn jsonpath(&self, namespace: &str, path: &str) -> Result<Option<String>, CommandError> {
        let value = self
            .kubectl(&["get", "namespace", namespace, "-o", &format!("jsonpath={path}")])
            .await?;
        Ok(Some(value).filter(|value| !value.is_empty()))
    }
}

async fn run(program: &str, args: &[&str]) -> Result<String, CommandError> {
    // Arguments may carry generated secrets; only the subcommand is logged.
    debug!(program, subcommand = args.first().copied().unwrap_or(""), "running command");

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CommandError::Failed(if stderr.is_empty() { stdout } else { stderr }));
    }

    Ok(stdout)
}

pub fn helm_install_args(release: &ReleaseSpec) -> Vec<String> {
    let mut args = vec![
        "upgrade".to_string(),
        "--install".to_string(),
        release.name.clone(),
        release.chart.clone(),
        "-n".to_string(),
        release.namespace.clone(),
        "--wait".to_string(),
        "--timeout".to_string(),
        release.timeout.clone(),
    ];
    for (key, value) in &release.values {
        args.push("--set-string".to_string());
        args.push(format!("{key}={value}"));
    }
    args
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<PodItem>,
}

#[derive(Debug, Deserialize)]
struct PodItem {
    #[serde(default)]
    status: PodItemStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodItemStatus {
    phase: Option<String>,
    #[serde(default)]
    container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Deserialize)]
struct ContainerStatus {
    #[serde(default)]
    ready: bool,
}

pub fn parse_pod_list(raw: &str) -> Result<Vec<PodState>, serde_json::Error> {
    let list: PodList = serde_json::from_str(raw)?;
    Ok(list
        .items
        .into_iter()
        .map(|item| PodState {
            phase: item.status.phase.unwrap_or_else(|| "Unknown".to_string()),
            containers_ready: item
                .status
                .container_statuses
                .iter()
                .map(|status| status.ready)
                .collect(),
        })
        .collect())
}

#[async_trait]
impl Cluster for KubectlCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>, CommandError> {
        let raw = self
            .kubectl(&["get", "ns", "-o", "jsonpath={.items[*].metadata.name}"])
            .await?;
        Ok(raw.split_whitespace().map(ToString::to_string).collect())
    }

    async fn namespace_exists(&self, namespace: &str) -> bool {
        self.kubectl(&["get", "namespace", namespace]).await.is_ok()
    }

    async fn namespace_label(
        &self,
        namespace: &str,
        label: &str,
    ) -> Result<Option<String>, CommandError> {
        self.jsonpath(namespace, &format!("{{.metadata.labels.{label}}}"))
            .await
    }

    async fn namespace_created_at(&self, namespace: &str) -> Result<Option<String>, CommandError> {
        self.jsonpath(namespace, "{.metadata.creationTimestamp}").await
    }

    async fn pods(&self, namespace: &str) -> Result<Vec<PodState>, CommandError> {
        let raw = self
            .kubectl(&["get", "pods", "-n", namespace, "-o", "json"])
            .await?;
        parse_pod_list(&raw).map_err(|err| CommandError::Parse {
            program: self.kubectl.clone(),
            message: err.to_string(),
        })
    }

    async fn create_namespace(&self, namespace: &str) -> Result<(), CommandError> {
        self.kubectl(&["create", "namespace", namespace]).await?;
        Ok(())
    }

    async fn label_namespace(
        &self,
        namespace: &str,
        label: &str,
        value: &str,
    ) -> Result<(), CommandError> {
        let assignment = format!("{label}={value}");
        self.kubectl(&["label", "namespace", namespace, &assignment, "--overwrite"])
            .await?;
        Ok(())
    }

    async fn install_release(&self, release: &ReleaseSpec) -> Result<(), CommandError> {
        let args = helm_install_args(release);
        let args = args.iter().map(String::as_str).collect::<Vec<_>>();
        run(&self.helm, &args).await?;
        Ok(())
    }

    async fn uninstall_release(&self, name: &str, namespace: &str) -> Result<(), CommandError> {
        run(&self.helm, &["uninstall", name, "-n", namespace]).await?;
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), CommandError> {
        self.kubectl(&["delete", "namespace", namespace, "--wait=true"])
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryNamespace {
    labels: HashMap<String, String>,
    created_at: String,
    releases: Vec<String>,
}

/// In-process stand-in for a cluster. Installed releases report one running,
/// ready pod straight away.
pub struct MemoryCluster {
    namespaces: Mutex<BTreeMap<String, MemoryNamespace>>,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        let system = ["default", "kube-system"]
            .into_iter()
            .map(|name| (name.to_string(), MemoryNamespace::default()))
            .collect();
        Self {
            namespaces: Mutex::new(system),
        }
    }
}

#[async_trait]
impl Cluster for MemoryCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>, CommandError> {
        Ok(self.namespaces.lock().await.keys().cloned().collect())
    }

    async fn namespace_exists(&self, namespace: &str) -> bool {
        self.namespaces.lock().await.contains_key(namespace)
    }

    async fn namespace_label(
        &self,
        namespace: &str,
        label: &str,
    ) -> Result<Option<String>, CommandError> {
        let namespaces = self.namespaces.lock().await;
        let entry = namespaces
            .get(namespace)
            .ok_or_else(|| not_found(namespace))?;
        Ok(entry.labels.get(label).cloned())
    }

    async fn namespace_created_at(&self, namespace: &str) -> Result<Option<String>, CommandError> {
        let namespaces = self.namespaces.lock().await;
        let entry = namespaces
            .get(namespace)
            .ok_or_else(|| not_found(namespace))?;
        Ok(Some(entry.created_at.clone()).filter(|value| !value.is_empty()))
    }

    async fn pods(&self, namespace: &str) -> Result<Vec<PodState>, CommandError> {
        let namespaces = self.namespaces.lock().await;
        let entry = namespaces
            .get(namespace)
            .ok_or_else(|| not_found(namespace))?;
        Ok(entry
            .releases
            .iter()
            .map(|_| PodState {
                phase: "Running".to_string(),
                containers_ready: vec![true],
            })
            .collect())
    }

    async fn create_namespace(&self, namespace: &str) -> Result<(), CommandError> {
        let mut namespaces = self.namespaces.lock().await;
        if namespaces.contains_key(namespace) {
            return Err(CommandError::Failed(format!(
                "namespaces \"{namespace}\" already exists"
            )));
        }
        namespaces.insert(
            namespace.to_string(),
            MemoryNamespace {
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                ..MemoryNamespace::default()
            },
        );
        Ok(())
    }

    async fn label_namespace(
        &self,
        namespace: &str,
        label: &str,
        value: &str,
    ) -> Result<(), CommandError> {
        let mut namespaces = self.namespaces.lock().await;
        let entry = namespaces
            .get_mut(namespace)
            .ok_or_else(|| not_found(namespace))?;
        entry.labels.insert(label.to_string(), value.to_string());
        Ok(())
    }

    async fn install_release(&self, release: &ReleaseSpec) -> Result<(), CommandError> {
        let mut namespaces = self.namespaces.lock().await;
        let entry = namespaces
            .get_mut(&release.namespace)
            .ok_or_else(|| not_found(&release.namespace))?;
        if !entry.releases.contains(&release.name) {
            entry.releases.push(release.name.clone());
        }
        Ok(())
    }

    async fn uninstall_release(&self, name: &str, namespace: &str) -> Result<(), CommandError> {
        let mut namespaces = self.namespaces.lock().await;
        let entry = namespaces
            .get_mut(namespace)
            .ok_or_else(|| not_found(namespace))?;
        entry.releases.retain(|release| release != name);
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), CommandError> {
        self.namespaces
            .lock()
            .await
            .remove(namespace)
            .map(|_| ())
            .ok_or_else(|| not_found(namespace))
    }
}

fn not_found(namespace: &str) -> CommandError {
    CommandError::Failed(format!(
        "Error from server (NotFound): namespaces \"{namespace}\" not found"
    ))
}
