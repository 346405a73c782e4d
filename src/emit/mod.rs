//! Turning an aggregated report into PDF bytes.
//!
//! Two interchangeable backends implement [`Emitter`]:
//!
//! - [`DrawEmitter`] places every line and image itself through the flow layout and draws with
//!   the built-in Helvetica faces of printpdf.  It needs no font files.
//! - [`TableEmitter`] lays each group out as a table with `genpdf` and needs a TrueType family
//!   on disk (see [`crate::fonts`]).

mod draw;
mod table;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::aggregate::Report;
use crate::layout::{LayoutOptions, PageGeometry};
use crate::model::ReportScope;

pub use draw::DrawEmitter;
pub use table::TableEmitter;

/// A finished PDF document.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    /// Number of pages, when the backend knows it.
    pub page_count: Option<usize>,
    /// Images left out because their payload could not be decoded.
    pub skipped_images: usize,
}

/// Renders reports into PDF documents.
pub trait Emitter: Send + Sync {
    fn emit(&self, report: &Report, scope: &ReportScope) -> Result<RenderedReport, EmitError>;
}

/// Errors raised while producing the PDF bytes.
#[derive(Debug)]
pub enum EmitError {
    /// No usable font family could be loaded.
    Font(genpdf::error::Error),
    /// An image could not be embedded into the document.
    Image(String),
    /// The PDF writer failed.
    Render(String),
    /// The group outline could not be added to the finished document.
    #[cfg(feature = "bookmarks")]
    Bookmarks(crate::bookmarks::BookmarkError),
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Font(err) => write!(f, "Failed to load report fonts: {err}"),
            Self::Image(message) => write!(f, "Failed to embed image: {message}"),
            Self::Render(message) => write!(f, "Failed to render PDF: {message}"),
            #[cfg(feature = "bookmarks")]
            Self::Bookmarks(err) => write!(f, "Failed to add bookmarks: {err}"),
        }
    }
}

impl std::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Font(err) => Some(err),
            #[cfg(feature = "bookmarks")]
            Self::Bookmarks(err) => Some(err),
            Self::Image(_) | Self::Render(_) => None,
        }
    }
}

#[cfg(feature = "bookmarks")]
impl From<crate::bookmarks::BookmarkError> for EmitError {
    fn from(err: crate::bookmarks::BookmarkError) -> Self {
        Self::Bookmarks(err)
    }
}

/// Selects the emitter implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Draw,
    Table,
}

impl Backend {
    /// Creates the emitter for this backend.
    pub fn emitter(self, fonts_dir: Option<PathBuf>) -> Box<dyn Emitter> {
        match self {
            Self::Draw => Box::new(DrawEmitter::new(LayoutOptions::default())),
            Self::Table => Box::new(TableEmitter::new(fonts_dir, PageGeometry::a4())),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draw" => Ok(Self::Draw),
            "table" => Ok(Self::Table),
            other => Err(format!("unknown report backend '{other}', expected draw or table")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draw => "draw",
            Self::Table => "table",
        })
    }
}
