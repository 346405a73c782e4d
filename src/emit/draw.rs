use std::io::{BufWriter, Cursor};

use log::debug;
use printpdf::{
    BuiltinFont, Image, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use super::{EmitError, Emitter, RenderedReport};
use crate::aggregate::Report;
use crate::elements::{natural_size_mm, DEFAULT_IMAGE_DPI};
use crate::layout::{paginate, DrawKind, LayoutOptions, PagedLayout, Rect};
use crate::model::ReportScope;

const LAYER_NAME: &str = "Conteúdo";

/// Share of a text box below the baseline.
const DESCENT_RATIO: f64 = 0.25;

/// Emitter drawing the paginated flow layout with printpdf.
#[derive(Clone, Debug, Default)]
pub struct DrawEmitter {
    options: LayoutOptions,
}

impl DrawEmitter {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }
}

impl Emitter for DrawEmitter {
    fn emit(&self, report: &Report, scope: &ReportScope) -> Result<RenderedReport, EmitError> {
        let layout = paginate(report, scope, &self.options);
        let bytes = draw(&layout)?;

        #[cfg(feature = "bookmarks")]
        let bytes = crate::bookmarks::apply_group_bookmarks(&bytes, &layout.group_starts)?;

        Ok(RenderedReport {
            bytes,
            page_count: Some(layout.pages.len()),
            skipped_images: layout.skipped_images,
        })
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn render_error(err: impl std::fmt::Display) -> EmitError {
    EmitError::Render(err.to_string())
}

fn draw(layout: &PagedLayout) -> Result<Vec<u8>, EmitError> {
    let geometry = layout.geometry;
    let (page_width, page_height) = (Mm(geometry.width), Mm(geometry.height));
    let (document, first_page, first_layer) =
        PdfDocument::new(layout.title.as_str(), page_width, page_height, LAYER_NAME);

    let fonts = Fonts {
        regular: document
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_error)?,
        bold: document
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_error)?,
    };

    for (index, page) in layout.pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            document.add_page(page_width, page_height, LAYER_NAME)
        };
        let layer = document.get_page(page_index).get_layer(layer_index);

        for instruction in page.instructions() {
            match &instruction.kind {
                DrawKind::Text { text, style } => {
                    let font = if style.bold { &fonts.bold } else { &fonts.regular };
                    let baseline = instruction.rect.bottom() - DESCENT_RATIO * instruction.rect.height;
                    layer.use_text(
                        text.as_str(),
                        style.font_size,
                        Mm(instruction.rect.x),
                        Mm(geometry.height - baseline),
                        font,
                    );
                }
                DrawKind::Image { image } => {
                    let image = layout.images.get(*image).ok_or_else(|| {
                        EmitError::Image(format!("layout refers to missing image #{image}"))
                    })?;
                    place_image(&layer, image, instruction.rect, geometry.height);
                }
            }
        }
    }

    debug!("Drew {} pages for '{}'", layout.pages.len(), layout.title);
    save(document)
}

fn place_image(
    layer: &PdfLayerReference,
    image: &image::DynamicImage,
    rect: Rect,
    page_height: f64,
) {
    let (natural_width, natural_height) = natural_size_mm(image, DEFAULT_IMAGE_DPI);
    let scale_x = rect.width / natural_width.max(f64::EPSILON);
    let scale_y = rect.height / natural_height.max(f64::EPSILON);

    Image::from_dynamic_image(image).add_to_layer(
        layer.clone(),
        Some(Mm(rect.x)),
        Some(Mm(page_height - rect.bottom())),
        None,
        Some(scale_x),
        Some(scale_y),
        Some(DEFAULT_IMAGE_DPI),
    );
}

fn save(document: PdfDocumentReference) -> Result<Vec<u8>, EmitError> {
    let mut writer = BufWriter::new(Cursor::new(Vec::new()));
    document.save(&mut writer).map_err(render_error)?;
    let cursor = writer.into_inner().map_err(render_error)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::elements::test_images::png_data_uri;
    use crate::model::Record;

    #[test]
    fn draws_a_pdf_with_images() {
        let report = aggregate(vec![
            Record::new()
                .with_plate("PAT-1")
                .with_cost_center("TI")
                .with_current_value("10")
                .with_image(png_data_uri(16, 12)),
            Record::new().with_cost_center("RH").with_image("broken"),
        ]);

        let rendered = DrawEmitter::default()
            .emit(&report, &ReportScope::All)
            .expect("render");

        assert!(rendered.bytes.starts_with(b"%PDF"));
        assert_eq!(rendered.page_count, Some(1));
        assert_eq!(rendered.skipped_images, 1);
    }

    #[test]
    fn long_reports_span_pages() {
        let records = (0..60).map(|index| {
            Record::new()
                .with_plate(format!("PAT-{index}"))
                .with_cost_center(format!("CC-{}", index % 4))
                .with_current_value("1")
        });
        let rendered = DrawEmitter::default()
            .emit(&aggregate(records), &ReportScope::All)
            .expect("render");

        assert!(rendered.page_count.unwrap_or_default() > 1);
    }
}
