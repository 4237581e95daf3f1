//! HTTP API over the snapshot store
//!
//! # Modules
//!
//! - [`handlers`]: one async handler per route
//! - [`responses`]: JSON bodies and the error helper

pub mod handlers;
pub mod responses;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;

use crate::scheduler::Scheduler;
use crate::store::SnapshotStore;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub scheduler: Arc<Scheduler>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/stacks", get(handlers::list_stacks))
        .route("/stacks/category/{category}", get(handlers::stacks_by_category))
        .route("/stacks/search", get(handlers::search_stacks))
        .route("/stacks/trending", get(handlers::trending_stacks))
        .route("/stacks/outdated", get(handlers::outdated_stacks))
        .route("/stacks/refresh", post(handlers::refresh_stacks))
        .route("/stacks/{name}", get(handlers::get_stack))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` resolves
pub async fn run_server(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP API listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
