use async_trait::async_trait;
use common::{
    CreateStoreRequest, DeleteStoreResponse, ErrorDetail, HealthStatus, Store, StoreEngine,
};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{}", rejected_message(.status, .detail))]
    Rejected { status: u16, detail: Option<String> },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("invalid API base url: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// Human-readable reason supplied by the server, if it sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

fn rejected_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => detail.clone(),
        None => format!("server rejected request with status {status}"),
    }
}

/// The three calls the dashboard makes against the provisioning API.
#[async_trait]
pub trait StoreApi: Send + Sync {
    async fn list_stores(&self) -> Result<Vec<Store>, ClientError>;

    async fn create_store(&self, name: &str, engine: StoreEngine) -> Result<Store, ClientError>;

    async fn delete_store(&self, name: &str) -> Result<DeleteStoreResponse, ClientError>;
}

#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    api_base_url: String,
}

impl StoreClient {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self::with_http_client(Client::new(), api_base_url)
    }

    pub fn with_http_client(http: Client, api_base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let url = self.endpoint("health")?;
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Url::parse(&format!("{}/{path}", self.api_base_url))
            .map_err(|_| ClientError::InvalidBaseUrl(self.api_base_url.clone()))
    }

    fn store_url(&self, name: &str) -> Result<Url, ClientError> {
        let mut url = self.endpoint("stores")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.api_base_url.clone()))?
            .push(name);
        Ok(url)
    }
}

#[async_trait]
impl StoreApi for StoreClient {
    async fn list_stores(&self) -> Result<Vec<Store>, ClientError> {
        let url = self.endpoint("stores")?;
        let response = self.http.get(url).send().await?;
        let stores: Vec<Store> = decode(response).await?;
        debug!(count = stores.len(), "fetched store list");
        Ok(stores)
    }

    async fn create_store(&self, name: &str, engine: StoreEngine) -> Result<Store, ClientError> {
        let url = self.store_url(name)?;
        let response = self
            .http
            .post(url)
            .json(&CreateStoreRequest { engine })
            .send()
            .await?;
        decode(response).await
    }

    async fn delete_store(&self, name: &str) -> Result<DeleteStoreResponse, ClientError> {
        let url = self.store_url(name)?;
        let response = self.http.delete(url).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        // A body that is not `{detail}` JSON leaves the caller to pick its own fallback.
        let detail = response
            .json::<ErrorDetail>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .filter(|detail| !detail.is_empty());
        return Err(ClientError::Rejected {
            status: status.as_u16(),
            detail,
        });
    }

    Ok(response.json::<T>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn list_stores_decodes_records_in_server_order() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/stores")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {
                        "name": "store-b",
                        "engine": "woocommerce",
                        "status": "Ready",
                        "url": "http://store-b.localtest.me",
                        "created_at": "2024-05-02T10:00:00Z"
                    },
                    {
                        "name": "store-a",
                        "engine": "medusa",
                        "status": "Provisioning",
                        "url": "http://store-a.localtest.me",
                        "created_at": null
                    }
                ])
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = StoreClient::new(server.url());
        let stores = client.list_stores().await.unwrap();

        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0].name, "store-b");
        assert_eq!(stores[1].created_at, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_store_posts_engine_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/stores/store-shop")
            .match_body(Matcher::Json(json!({ "engine": "woocommerce" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "name": "store-shop",
                    "engine": "woocommerce",
                    "status": "Provisioning",
                    "url": "http://store-shop.localtest.me",
                    "created_at": "2024-05-02T10:00:00+00:00"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = StoreClient::new(format!("{}/", server.url()));
        let store = client
            .create_store("store-shop", StoreEngine::WooCommerce)
            .await
            .unwrap();

        assert_eq!(store.status, "Provisioning");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_create_carries_server_detail() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/stores/shop")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"Store name must start with 'store-'."}"#)
            .create_async()
            .await;

        let client = StoreClient::new(server.url());
        let err = client
            .create_store("shop", StoreEngine::WooCommerce)
            .await
            .unwrap_err();

        assert!(err.is_rejection());
        assert_eq!(err.detail(), Some("Store name must start with 'store-'."));
        assert_eq!(err.to_string(), "Store name must start with 'store-'.");
    }

    #[tokio::test]
    async fn rejection_without_json_body_has_no_detail() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/stores/store-x")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let client = StoreClient::new(server.url());
        let err = client.delete_store("store-x").await.unwrap_err();

        assert_eq!(err.detail(), None);
        assert_eq!(err.to_string(), "server rejected request with status 500");
    }

    #[test]
    fn store_names_are_encoded_as_one_path_segment() {
        let client = StoreClient::new("http://127.0.0.1:8000/");
        let url = client.store_url("store a/b").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/stores/store%20a%2Fb");
    }

    #[tokio::test]
    async fn malformed_list_body_is_a_transport_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/stores")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = StoreClient::new(server.url());
        let err = client.list_stores().await.unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn health_reads_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let client = StoreClient::new(server.url());
        assert_eq!(client.health().await.unwrap(), HealthStatus::ok());
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let client = StoreClient::new("not a url");
        let err = client.store_url("store-a").unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl(_)));
    }
}
