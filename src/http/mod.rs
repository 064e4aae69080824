//! HTTP transport for the swap engine.
//!
//! Every route lives under `/api` except `GET /health`. Handlers decode the
//! request and run one service call on the blocking pool. Errors render as
//! `{"success": false, "error", "message"}`.
mod admin;
mod auth;
pub mod dto;
pub mod error;
mod extract;
mod items;
mod swaps;

pub use error::{ApiError, ApiResult};
pub use extract::{ApiJson, ApiPath, ApiQuery, AuthUser};

use crate::auth::TokenIssuer;
use crate::error::MarketResult;
use crate::service::MarketService;
use crate::types::PageRequest;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub service: MarketService,
    pub tokens: TokenIssuer,
    pub page_size: usize,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(service: MarketService, tokens: TokenIssuer, page_size: usize) -> SharedState {
        Arc::new(Self {
            service,
            tokens,
            page_size,
        })
    }

    fn page(&self, page: Option<usize>, per_page: Option<usize>) -> PageRequest {
        PageRequest::new(page.unwrap_or(1), per_page.unwrap_or(self.page_size))
    }
}

pub fn router(state: SharedState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::routes())
        .nest("/items", items::routes())
        .nest("/swap", swaps::routes())
        .nest("/admin", admin::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: SharedState, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state)).await
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Run a service call on the blocking pool; sled calls may hit the disk.
pub(crate) async fn blocking<T, F>(state: &SharedState, op: F) -> ApiResult<T>
where
    F: FnOnce(&MarketService) -> MarketResult<T> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    Ok(tokio::task::spawn_blocking(move || op(&service)).await??)
}
