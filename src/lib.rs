//! Cost-center asset inventory reports rendered to PDF.
//!
//! Records go through [`aggregate::aggregate`], one of the [`layout`] strategies and an
//! [`emit::Emitter`]; [`generate`] runs the whole pipeline for an already fetched record set.

pub mod aggregate;
pub mod builder;
pub mod elements;
pub mod emit;
pub mod fonts;
pub mod layout;
pub mod model;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

use std::fmt;

use log::info;

use crate::emit::{EmitError, Emitter, RenderedReport};
use crate::model::{Record, ReportScope};

/// Errors of [`generate`].
#[derive(Debug)]
pub enum ReportError {
    /// A cost-center report matched no records.
    NoRecords(String),
    Emit(EmitError),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRecords(cost_center) => {
                write!(f, "No assets found for cost center '{cost_center}'")
            }
            Self::Emit(err) => write!(f, "Failed to generate report: {err}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoRecords(_) => None,
            Self::Emit(err) => Some(err),
        }
    }
}

impl From<EmitError> for ReportError {
    fn from(err: EmitError) -> Self {
        Self::Emit(err)
    }
}

/// Aggregates `records` and renders them for `scope`.
///
/// A cost-center scope without records fails with [`ReportError::NoRecords`] before any layout
/// work; the full report of an empty inventory is still rendered.
pub fn generate(
    records: Vec<Record>,
    scope: &ReportScope,
    emitter: &dyn Emitter,
) -> Result<RenderedReport, ReportError> {
    if let ReportScope::CostCenter(cost_center) = scope {
        if records.is_empty() {
            return Err(ReportError::NoRecords(cost_center.clone()));
        }
    }

    let report = aggregate::aggregate(records);
    let rendered = emitter.emit(&report, scope)?;
    info!(
        "Generated '{}': {} records in {} groups, {} bytes, {} skipped images",
        scope.title(),
        report.record_count(),
        report.groups().len(),
        rendered.bytes.len(),
        rendered.skipped_images
    );
    Ok(rendered)
}
