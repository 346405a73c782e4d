//! Report endpoints.

use std::sync::Arc;

use asset_report::generate;
use asset_report::model::ReportScope;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::delivery;
use crate::error::ApiError;
use crate::AppState;

/// Creates the report and health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/relatorio", get(full_report))
        .route("/relatorioCC/{cost_center}", get(cost_center_report))
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}

async fn full_report(State(state): State<AppState>) -> Response {
    respond(&state, ReportScope::All).await
}

async fn cost_center_report(
    State(state): State<AppState>,
    Path(cost_center): Path<String>,
) -> Response {
    respond(&state, ReportScope::CostCenter(cost_center)).await
}

async fn respond(state: &AppState, scope: ReportScope) -> Response {
    match build_report(state, &scope).await {
        Ok(response) => response,
        Err(err) => err.into_response_for(&scope),
    }
}

/// Fetches the records of `scope`, renders them on the blocking pool and delivers the file.
pub async fn build_report(state: &AppState, scope: &ReportScope) -> Result<Response, ApiError> {
    let records = match scope {
        ReportScope::All => state.store.fetch_all().await?,
        ReportScope::CostCenter(cost_center) => {
            state.store.fetch_by_cost_center(cost_center).await?
        }
    };
    info!(%scope, count = records.len(), "Fetched records");

    let emitter = Arc::clone(&state.emitter);
    let task_scope = scope.clone();
    let rendered =
        tokio::task::spawn_blocking(move || generate(records, &task_scope, emitter.as_ref()))
            .await??;

    Ok(delivery::deliver(&state.output_dir, &scope.file_name(), rendered).await?)
}
