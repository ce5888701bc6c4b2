use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{CreateStoreRequest, DeleteStoreResponse, ErrorDetail, HealthStatus, Store};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cluster;
mod config;
mod stores;
mod ui;

use cluster::{Cluster, KubectlCluster, MemoryCluster};
use config::{ClusterMode, ProvisionerConfig};
use stores::{ProvisionError, StoreService};

#[derive(Clone)]
struct ServerState {
    service: Arc<StoreService>,
    config: Arc<ProvisionerConfig>,
}

impl ServerState {
    fn new(cluster: Arc<dyn Cluster>, config: ProvisionerConfig) -> Self {
        Self {
            service: Arc::new(StoreService::new(cluster, &config)),
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .compact()
        .init();

    let config = ProvisionerConfig::from_env().context("invalid provisioner configuration")?;
    let cluster: Arc<dyn Cluster> = match config.cluster_mode {
        ClusterMode::Kubectl => Arc::new(KubectlCluster::default()),
        ClusterMode::Memory => Arc::new(MemoryCluster::default()),
    };

    let bind_addr = config.bind_addr;
    info!(
        %bind_addr,
        cluster = config.cluster_mode.as_str(),
        chart = %config.chart_path,
        "store provisioner listening"
    );

    let app = router(ServerState::new(cluster, config));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: ServerState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health))
        .route("/stores", get(list_stores))
        .route("/stores/{name}", post(create_store).delete(delete_store))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    // A `*` entry echoes the request origin; credentialed responses cannot carry `*`.
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

impl IntoResponse for ProvisionError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProvisionError::InvalidName => StatusCode::BAD_REQUEST,
            ProvisionError::UnsupportedEngine(_) => StatusCode::NOT_IMPLEMENTED,
            ProvisionError::Command(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "store operation failed");
        }
        (status, Json(ErrorDetail::new(self.to_string()))).into_response()
    }
}

fn rejection_response(rejection: JsonRejection) -> Response {
    (
        rejection.status(),
        Json(ErrorDetail::new(rejection.body_text())),
    )
        .into_response()
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

async fn list_stores(State(state): State<ServerState>) -> Result<Json<Vec<Store>>, ProvisionError> {
    Ok(Json(state.service.list().await?))
}

async fn create_store(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    payload: Result<Json<CreateStoreRequest>, JsonRejection>,
) -> Result<Json<Store>, Response> {
    let Json(payload) = payload.map_err(rejection_response)?;
    info!(store = %name, engine = %payload.engine, "provisioning requested");
    state
        .service
        .create(&name, payload.engine)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

async fn delete_store(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteStoreResponse>, ProvisionError> {
    info!(store = %name, "deletion requested");
    Ok(Json(state.service.delete(&name).await?))
}
