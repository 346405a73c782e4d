//! Row composition for the table rendering of a report.
//!
//! The rows come out in reading order; the document backend decides where pages break and keeps
//! each row whole.

use std::fmt;

use image::DynamicImage;
use log::warn;

use super::{format_currency, labels, text_or_placeholder};
use crate::aggregate::Report;
use crate::elements::decode_payload;
use crate::model::{Record, ReportScope};

/// Header cells of the per-group asset table.
pub const COLUMN_HEADERS: [&str; 6] = [
    labels::PLATE,
    labels::NAME,
    labels::DESCRIPTION,
    labels::CONSERVATION,
    labels::CURRENT_VALUE,
    labels::MARKET_VALUE,
];

/// One block of the flowing table layout.
pub enum RowBlock {
    Title(String),
    GroupHeading(String),
    ColumnHeader,
    /// Cells in [`COLUMN_HEADERS`] order.
    Record([String; 6]),
    /// Images of the preceding record, left to right.
    Gallery(Vec<DynamicImage>),
    Subtotal { current: String, market: String },
    GrandTotalHeading,
    GrandTotal { current: String, market: String },
}

impl fmt::Debug for RowBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title(title) => f.debug_tuple("Title").field(title).finish(),
            Self::GroupHeading(heading) => f.debug_tuple("GroupHeading").field(heading).finish(),
            Self::ColumnHeader => f.write_str("ColumnHeader"),
            Self::Record(cells) => f.debug_tuple("Record").field(cells).finish(),
            Self::Gallery(images) => write!(f, "Gallery({} images)", images.len()),
            Self::Subtotal { current, market } => f
                .debug_struct("Subtotal")
                .field("current", current)
                .field("market", market)
                .finish(),
            Self::GrandTotalHeading => f.write_str("GrandTotalHeading"),
            Self::GrandTotal { current, market } => f
                .debug_struct("GrandTotal")
                .field("current", current)
                .field("market", market)
                .finish(),
        }
    }
}

/// Ordered rows plus the number of images that failed to decode.
#[derive(Debug, Default)]
pub struct RowSequence {
    pub rows: Vec<RowBlock>,
    pub skipped_images: usize,
}

fn record_cells(record: &Record) -> [String; 6] {
    [
        text_or_placeholder(record.plate()).to_string(),
        text_or_placeholder(record.name()).to_string(),
        text_or_placeholder(record.description()).to_string(),
        text_or_placeholder(record.conservation_state()).to_string(),
        format_currency(record.current_value()),
        format_currency(record.market_value()),
    ]
}

/// Composes the rows of `report`: title, then per group a heading, the column header, one row
/// per record followed by its gallery when it has images, and the subtotal row; the grand-total
/// section closes the sequence when the scope includes it.
pub fn compose_rows(report: &Report, scope: &ReportScope) -> RowSequence {
    let mut sequence = RowSequence::default();
    sequence.rows.push(RowBlock::Title(scope.title()));

    for group in report.groups() {
        sequence.rows.push(RowBlock::GroupHeading(format!(
            "{}: {}",
            labels::GROUP_HEADING,
            group.cost_center()
        )));
        sequence.rows.push(RowBlock::ColumnHeader);

        for record in group.records() {
            sequence.rows.push(RowBlock::Record(record_cells(record)));

            let mut gallery = Vec::new();
            for payload in record.images() {
                match decode_payload(&payload) {
                    Ok(image) => gallery.push(image),
                    Err(err) => {
                        sequence.skipped_images += 1;
                        warn!(
                            "Skipping image of asset {}: {}",
                            text_or_placeholder(record.plate()),
                            err
                        );
                    }
                }
            }
            if !gallery.is_empty() {
                sequence.rows.push(RowBlock::Gallery(gallery));
            }
        }

        let subtotal = group.subtotal();
        sequence.rows.push(RowBlock::Subtotal {
            current: format_currency(subtotal.current_value),
            market: format_currency(subtotal.market_value),
        });
    }

    if scope.includes_grand_total() {
        let totals = report.totals();
        sequence.rows.push(RowBlock::GrandTotalHeading);
        sequence.rows.push(RowBlock::GrandTotal {
            current: format_currency(totals.current_value),
            market: format_currency(totals.market_value),
        });
    }

    sequence
}
