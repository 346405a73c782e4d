//! HTTP layer of the asset report service.
//!
//! This crate provides:
//! - the report routes (`/relatorio`, `/relatorioCC/{cost_center}`, `/health`)
//! - record stores (Firestore, JSON file, in-memory)
//! - configuration loading and report delivery

pub mod config;
pub mod delivery;
pub mod error;
pub mod routes;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use asset_report::emit::Emitter;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::store::RecordStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Source of asset records.
    pub store: Arc<dyn RecordStore>,
    /// Backend turning reports into PDF bytes.
    pub emitter: Arc<dyn Emitter>,
    /// Directory receiving generated reports.
    pub output_dir: PathBuf,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
