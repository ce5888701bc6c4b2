use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use common::{DeleteStoreResponse, Store, StoreEngine, StoreStatus};
use rand::RngCore;
use tracing::{info, warn};

use crate::cluster::{Cluster, CommandError, PodState, ReleaseSpec};
use crate::config::ProvisionerConfig;

pub const STORE_NAME_PREFIX: &str = "store-";
pub const ENGINE_LABEL: &str = "store-engine";
const INSTALL_TIMEOUT: &str = "10m";
const SECRET_BYTES: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Store name must start with 'store-'.")]
    InvalidName,
    #[error("{0} provisioning is not available yet. Use engine=woocommerce.")]
    UnsupportedEngine(StoreEngine),
    #[error(transparent)]
    Command(#[from] CommandError),
}

pub struct StoreService {
    cluster: Arc<dyn Cluster>,
    chart_path: String,
    store_domain: String,
}

impl StoreService {
    pub fn new(cluster: Arc<dyn Cluster>, config: &ProvisionerConfig) -> Self {
        Self {
            cluster,
            chart_path: config.chart_path.clone(),
            store_domain: config.store_domain.clone(),
        }
    }

    pub fn store_host(&self, name: &str) -> String {
        format!("{name}.{}", self.store_domain)
    }

    pub fn store_url(&self, name: &str) -> String {
        format!("http://{}", self.store_host(name))
    }

    pub async fn list(&self) -> Result<Vec<Store>, ProvisionError> {
        let namespaces = self.cluster.list_namespaces().await?;

        let mut stores = Vec::new();
        for namespace in namespaces
            .into_iter()
            .filter(|namespace| namespace.starts_with(STORE_NAME_PREFIX))
        {
            let engine = match self.cluster.namespace_label(&namespace, ENGINE_LABEL).await {
                Ok(Some(engine)) if !engine.is_empty() => engine,
                _ => StoreEngine::WooCommerce.to_string(),
            };

            let status = match self.cluster.pods(&namespace).await {
                Ok(pods) => pod_health_status(&pods),
                Err(err) => {
                    warn!(namespace = %namespace, error = %err, "failed to read pod health");
                    StoreStatus::Failed
                }
            };

            let created_at = self
                .cluster
                .namespace_created_at(&namespace)
                .await
                .ok()
                .flatten();

            stores.push(Store {
                url: self.store_url(&namespace),
                name: namespace,
                engine,
                status: status.label().to_string(),
                created_at,
            });
        }

        sort_newest_first(&mut stores);
        Ok(stores)
    }

    pub async fn create(&self, name: &str, engine: StoreEngine) -> Result<Store, ProvisionError> {
        if !name.starts_with(STORE_NAME_PREFIX) {
            return Err(ProvisionError::InvalidName);
        }
        if engine != StoreEngine::WooCommerce {
            return Err(ProvisionError::UnsupportedEngine(engine));
        }

        if !self.cluster.namespace_exists(name).await {
            self.cluster.create_namespace(name).await?;
        }
        self.cluster
            .label_namespace(name, ENGINE_LABEL, StoreEngine::WooCommerce.as_str())
            .await?;

        let release = ReleaseSpec {
            name: name.to_string(),
            namespace: name.to_string(),
            chart: self.chart_path.clone(),
            timeout: INSTALL_TIMEOUT.to_string(),
            values: vec![
                ("db.rootPassword".to_string(), generate_secret()),
                ("wordpress.adminPassword".to_string(), generate_secret()),
                ("ingress.host".to_string(), self.store_host(name)),
            ],
        };
        self.cluster.install_release(&release).await?;
        info!(store = %name, engine = %engine, "store release installed");

        Ok(Store {
            name: name.to_string(),
            engine: StoreEngine::WooCommerce.to_string(),
            status: StoreStatus::Provisioning.label().to_string(),
            url: self.store_url(name),
            created_at: Some(Utc::now().to_rfc3339()),
        })
    }

    pub async fn delete(&self, name: &str) -> Result<DeleteStoreResponse, ProvisionError> {
        if self.cluster.namespace_exists(name).await {
            if let Err(err) = self.cluster.uninstall_release(name, name).await {
                warn!(store = %name, error = %err, "helm uninstall failed, deleting namespace anyway");
            }
            self.cluster.delete_namespace(name).await?;
            info!(store = %name, "store namespace deleted");
        }

        Ok(DeleteStoreResponse {
            store: name.to_string(),
            status: "deleted".to_string(),
        })
    }
}

pub fn pod_health_status(pods: &[PodState]) -> StoreStatus {
    if pods.is_empty() {
        return StoreStatus::Provisioning;
    }
    if pods.iter().any(|pod| pod.phase == "Failed") {
        return StoreStatus::Failed;
    }

    let all_running = pods.iter().all(|pod| pod.phase == "Running");
    let mut ready = pods.iter().flat_map(|pod| pod.containers_ready.iter()).peekable();
    if all_running && ready.peek().is_some() && ready.all(|flag| *flag) {
        return StoreStatus::Ready;
    }

    StoreStatus::Provisioning
}

/// Newest first; stores without a creation time sink to the end.
pub fn sort_newest_first(stores: &mut [Store]) {
    stores.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
