use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use client_sdk::StoreClient;
use common::StoreEngine;
use dashboard::Dashboard;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
struct WebState {
    client: StoreClient,
}

#[derive(Debug, Deserialize)]
struct CreateStoreForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    engine: String,
}

pub fn router(client: StoreClient) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/stores", post(create_store))
        .route("/stores/{name}/delete", post(delete_store))
        .route("/api/health", get(api_health))
        .route(
            "/api/ping",
            get(|| async {
                Json(serde_json::json!({
                    "ok": true,
                    "service": "storectl-web"
                }))
            }),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(WebState { client })
}

pub async fn serve(client: StoreClient, bind_addr: SocketAddr) -> Result<()> {
    info!(%bind_addr, api = %client.api_base_url(), "dashboard listening");
    println!("web interface at http://{bind_addr}");

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    axum::serve(listener, router(client))
        .await
        .context("dashboard server stopped unexpectedly")?;
    Ok(())
}

fn render(dashboard: &Dashboard<StoreClient>) -> Html<String> {
    Html(web_ui::app_html(dashboard, dashboard.api().api_base_url()))
}

async fn index(State(state): State<WebState>) -> Html<String> {
    let mut dashboard = Dashboard::new(state.client);
    dashboard.load().await;
    render(&dashboard)
}

async fn create_store(
    State(state): State<WebState>,
    Form(form): Form<CreateStoreForm>,
) -> Html<String> {
    let mut dashboard = Dashboard::new(state.client);
    let outcome = match parse_engine(&form.engine) {
        Ok(engine) => dashboard.create(&form.name, engine).await,
        Err(err) => dashboard.reject_draft(&form.name, err.to_string()),
    };
    if !outcome.is_completed() {
        redraw_rows(&mut dashboard).await;
    }
    render(&dashboard)
}

async fn delete_store(State(state): State<WebState>, Path(name): Path<String>) -> Html<String> {
    let mut dashboard = Dashboard::new(state.client);
    if !dashboard.delete(&name).await.is_completed() {
        redraw_rows(&mut dashboard).await;
    }
    render(&dashboard)
}

fn parse_engine(raw: &str) -> Result<StoreEngine, common::UnknownEngine> {
    if raw.trim().is_empty() {
        return Ok(StoreEngine::default());
    }
    raw.parse()
}

/// Refill the table after a failed action; the failure stays on the status line.
async fn redraw_rows(dashboard: &mut Dashboard<StoreClient>) {
    if let Err(err) = dashboard.refresh().await {
        warn!(error = %err, "failed to reload store list after a failed action");
    }
}

async fn api_health(State(state): State<WebState>) -> impl IntoResponse {
    match state.client.health().await {
        Ok(health) => (StatusCode::OK, Json(health)).into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}
