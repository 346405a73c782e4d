//! Request errors and their HTTP responses.

use asset_report::emit::EmitError;
use asset_report::model::ReportScope;
use asset_report::ReportError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, info};

use crate::store::StoreError;

/// Body of the 404 answer to a cost center without assets.
pub const NOT_FOUND_MESSAGE: &str = "Nenhum patrimônio encontrado para esse centro de custo.";
/// Body of the 500 answer of the full report.
pub const FULL_REPORT_FAILURE_MESSAGE: &str = "Erro ao gerar relatório";
/// Body of the 500 answer of a cost-center report.
pub const SCOPED_REPORT_FAILURE_MESSAGE: &str = "Erro ao gerar relatório.";

/// Failures of a report request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The cost center has no assets.
    #[error("No assets found for cost center {0}")]
    NotFound(String),

    /// Fetching the records failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Rendering the document failed.
    #[error("Report rendering failed: {0}")]
    Render(#[source] EmitError),

    /// The blocking render task panicked or was cancelled.
    #[error("Report task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Writing or reading the output file failed.
    #[error("Failed to deliver report: {0}")]
    Delivery(#[from] std::io::Error),
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::NoRecords(cost_center) => Self::NotFound(cost_center),
            ReportError::Emit(err) => Self::Render(err),
        }
    }
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Render(_) | Self::Task(_) | Self::Delivery(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Logs the failure and builds the plain-text answer for a request of `scope`.
    ///
    /// Server failures are reported to the caller with a generic message only.
    pub fn into_response_for(self, scope: &ReportScope) -> Response {
        let status = self.status_code();
        let message = match (&self, scope) {
            (Self::NotFound(_), _) => NOT_FOUND_MESSAGE,
            (_, ReportScope::All) => FULL_REPORT_FAILURE_MESSAGE,
            (_, ReportScope::CostCenter(_)) => SCOPED_REPORT_FAILURE_MESSAGE,
        };

        if status.is_server_error() {
            error!(%scope, error = %self, "Report generation failed");
        } else {
            info!(%scope, "{self}");
        }

        (status, message).into_response()
    }
}
