use std::path::PathBuf;

use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout};
use genpdf::style::Style;
use genpdf::{Alignment, Element as _};
use log::debug;

use super::{EmitError, Emitter, RenderedReport};
use crate::aggregate::Report;
use crate::builder::DocumentBuilder;
use crate::elements::GalleryImage;
use crate::layout::table::COLUMN_HEADERS;
use crate::layout::{compose_rows, labels, PageGeometry, RowBlock};
use crate::model::ReportScope;

const COLUMN_WEIGHTS: [usize; 6] = [2, 3, 4, 3, 2, 2];
const GALLERY_COLUMNS: usize = 3;
const GALLERY_IMAGE_WIDTH_MM: f64 = 40.0;
const FOOTER_HEIGHT_MM: f64 = 8.0;

/// Emitter rendering each group as a bordered `genpdf` table.
#[derive(Clone, Debug)]
pub struct TableEmitter {
    fonts_dir: Option<PathBuf>,
    geometry: PageGeometry,
}

impl TableEmitter {
    pub fn new(fonts_dir: Option<PathBuf>, geometry: PageGeometry) -> Self {
        Self {
            fonts_dir,
            geometry,
        }
    }
}

fn render_error(err: genpdf::error::Error) -> EmitError {
    EmitError::Render(err.to_string())
}

fn new_table() -> TableLayout {
    let mut table = TableLayout::new(COLUMN_WEIGHTS.to_vec());
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
    table
}

fn cell(text: &str, style: Style) -> impl genpdf::Element {
    Paragraph::new(text.to_string()).styled(style).padded(1)
}

/// Collects record rows until something other than a record interrupts the table.
struct TableBatch {
    table: Option<TableLayout>,
}

impl TableBatch {
    fn push_cells(&mut self, cells: &[String], style: Style) -> Result<(), EmitError> {
        let table = self.table.get_or_insert_with(new_table);
        let mut row = table.row();
        for text in cells {
            row = row.element(cell(text, style));
        }
        row.push().map_err(render_error)
    }

    fn flush(&mut self, document: &mut genpdf::Document) {
        if let Some(table) = self.table.take() {
            document.push(table);
        }
    }
}

fn gallery(images: Vec<image::DynamicImage>) -> Result<TableLayout, EmitError> {
    let mut table = TableLayout::new(vec![1; GALLERY_COLUMNS]);
    let mut images = images.into_iter().peekable();

    while images.peek().is_some() {
        let mut row = table.row();
        for _ in 0..GALLERY_COLUMNS {
            row = match images.next() {
                Some(image) => {
                    let element = GalleryImage::new(image, GALLERY_IMAGE_WIDTH_MM)
                        .map_err(|err| EmitError::Image(err.to_string()))?;
                    row.element(element.padded(2))
                }
                None => row.element(Paragraph::new("")),
            };
        }
        row.push().map_err(render_error)?;
    }

    Ok(table)
}

impl Emitter for TableEmitter {
    fn emit(&self, report: &Report, scope: &ReportScope) -> Result<RenderedReport, EmitError> {
        let sequence = compose_rows(report, scope);

        let mut document = DocumentBuilder::new()
            .with_fonts_dir(self.fonts_dir.clone())
            .with_title(scope.title())
            .with_geometry(&self.geometry)
            .with_footer(FOOTER_HEIGHT_MM, |page| {
                Paragraph::new(format!("Página {page}"))
                    .aligned(Alignment::Center)
                    .styled(Style::new().with_font_size(8))
            })
            .build()
            .map_err(EmitError::Font)?;

        let bold = Style::new().bold();
        let body = Style::new().with_font_size(9);
        let mut batch = TableBatch { table: None };

        for row in sequence.rows {
            if !matches!(row, RowBlock::ColumnHeader | RowBlock::Record(_)) {
                batch.flush(&mut document);
            }

            match row {
                RowBlock::Title(title) => {
                    document.push(
                        Paragraph::new(title)
                            .aligned(Alignment::Center)
                            .styled(Style::new().bold().with_font_size(16)),
                    );
                    document.push(Break::new(1));
                }
                RowBlock::GroupHeading(heading) => {
                    document.push(Break::new(1));
                    document.push(
                        Paragraph::new(heading).styled(Style::new().bold().with_font_size(13)),
                    );
                }
                RowBlock::ColumnHeader => {
                    let headers: Vec<String> =
                        COLUMN_HEADERS.iter().map(|header| header.to_string()).collect();
                    batch.push_cells(&headers, bold.with_font_size(9))?;
                }
                RowBlock::Record(cells) => batch.push_cells(&cells, body)?,
                RowBlock::Gallery(images) => document.push(gallery(images)?),
                RowBlock::Subtotal { current, market } => {
                    document.push(
                        Paragraph::new(format!(
                            "{} {}: {}  {}: {}",
                            labels::SUBTOTAL,
                            labels::CURRENT_VALUE,
                            current,
                            labels::MARKET_VALUE,
                            market
                        ))
                        .aligned(Alignment::Right)
                        .styled(bold),
                    );
                }
                RowBlock::GrandTotalHeading => {
                    document.push(Break::new(1));
                    document.push(
                        Paragraph::new(labels::GRAND_TOTAL_HEADING)
                            .styled(Style::new().bold().with_font_size(13)),
                    );
                }
                RowBlock::GrandTotal { current, market } => {
                    document.push(
                        Paragraph::new(format!("{}: {}", labels::GRAND_TOTAL_CURRENT, current))
                            .styled(bold),
                    );
                    document.push(
                        Paragraph::new(format!("{}: {}", labels::GRAND_TOTAL_MARKET, market))
                            .styled(bold),
                    );
                }
            }
        }
        batch.flush(&mut document);

        let mut bytes = Vec::new();
        document.render(&mut bytes).map_err(render_error)?;
        debug!("Rendered table report '{}' ({} bytes)", scope.title(), bytes.len());

        Ok(RenderedReport {
            bytes,
            page_count: None,
            skipped_images: sequence.skipped_images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::elements::test_images::png_data_uri;
    use crate::fonts;
    use crate::model::Record;

    #[test]
    fn renders_tables_when_fonts_are_installed() {
        if !fonts::fonts_available(None) {
            eprintln!("skipping: no report fonts installed");
            return;
        }

        let report = aggregate(vec![
            Record::new()
                .with_plate("PAT-9")
                .with_cost_center("Financeiro")
                .with_current_value("99.9")
                .with_image(png_data_uri(24, 24)),
            Record::new().with_cost_center("Financeiro"),
        ]);

        let rendered = TableEmitter::new(None, PageGeometry::a4())
            .emit(&report, &ReportScope::CostCenter("Financeiro".into()))
            .expect("render");
        assert!(rendered.bytes.starts_with(b"%PDF"));
        assert_eq!(rendered.skipped_images, 0);
    }
}
