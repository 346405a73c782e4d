//! Cursor-based pagination of a report onto fixed-size pages.
//!
//! [`paginate`] walks the report top to bottom with a [`LayoutCursor`].  Before any block is
//! placed the cursor checks the remaining vertical space and opens a new page when the block does
//! not fit, so no block is split across a page boundary unless it is taller than a whole page.
//! Every emitted [`DrawInstruction`] lies inside the drawable area of the page geometry.

use image::{DynamicImage, GenericImageView};
use log::{debug, warn};

use super::{
    format_currency, labels, metrics, text_or_placeholder, wrap_text, LayoutOptions,
    PageGeometry, Rect, EPSILON,
};
use crate::aggregate::{Group, Report, Totals};
use crate::elements::decode_payload;
use crate::model::{Record, ReportScope};

/// Font variant of a text instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub bold: bool,
}

/// What a draw instruction puts on the page.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawKind {
    /// A single line of text; the box spans the usable width.
    Text { text: String, style: TextStyle },
    /// An image, referring to [`PagedLayout::images`] by index.
    Image { image: usize },
}

/// A positioned text line or image.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawInstruction {
    pub rect: Rect,
    pub kind: DrawKind,
}

/// One page worth of instructions, in drawing order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    instructions: Vec<DrawInstruction>,
}

impl Page {
    pub fn instructions(&self) -> &[DrawInstruction] {
        &self.instructions
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Page on which a cost-center group begins (zero-based).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupStart {
    pub cost_center: String,
    pub page_index: usize,
}

/// Result of [`paginate`].
pub struct PagedLayout {
    pub geometry: PageGeometry,
    pub title: String,
    pub pages: Vec<Page>,
    /// Decoded images referenced by [`DrawKind::Image`].
    pub images: Vec<DynamicImage>,
    pub group_starts: Vec<GroupStart>,
    /// Images that were present on a record but could not be decoded.
    pub skipped_images: usize,
}

/// Writing position and page collection of one layout run.
struct LayoutCursor {
    geometry: PageGeometry,
    x: f64,
    y: f64,
    page: usize,
    pages: Vec<Page>,
}

impl LayoutCursor {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            x: geometry.left(),
            y: geometry.top(),
            page: 0,
            pages: vec![Page::default()],
        }
    }

    fn at_page_top(&self) -> bool {
        (self.y - self.geometry.top()).abs() < EPSILON && self.pages[self.page].is_empty()
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.page = self.pages.len() - 1;
        self.x = self.geometry.left();
        self.y = self.geometry.top();
    }

    fn fits(&self, height: f64) -> bool {
        self.y + height <= self.geometry.bottom() + EPSILON
    }

    /// Starts a new page unless `height` still fits.  A fresh page is never abandoned, which
    /// keeps oversized blocks from producing blank pages.  Returns whether a page was started.
    fn ensure_space(&mut self, height: f64) -> bool {
        if self.fits(height) || self.at_page_top() {
            return false;
        }
        self.new_page();
        true
    }

    fn place(&mut self, rect: Rect, kind: DrawKind) {
        debug_assert!(rect.fits_within(&self.geometry), "{rect:?} exceeds the page");
        self.pages[self.page]
            .instructions
            .push(DrawInstruction { rect, kind });
    }

    /// Places one line of text, moving to a new page when the line itself no longer fits.
    /// Blocks reserve their whole height first, so this only breaks runs taller than a page.
    fn text_line(&mut self, text: String, style: TextStyle, height: f64) {
        self.ensure_space(height);
        let rect = Rect::new(
            self.geometry.left(),
            self.y,
            self.geometry.usable_width(),
            height,
        );
        self.place(rect, DrawKind::Text { text, style });
        self.y += height;
    }
}

struct FlowLayout<'a> {
    options: &'a LayoutOptions,
    cursor: LayoutCursor,
    images: Vec<DynamicImage>,
    group_starts: Vec<GroupStart>,
    skipped_images: usize,
}

/// Lays the report out on pages.
///
/// Groups follow report order; each group gets a heading (kept on the same page as the first
/// line after it), the detail lines and images of every record, and a subtotal block.  The
/// grand-total section follows the last group when the scope includes it.
pub fn paginate(report: &Report, scope: &ReportScope, options: &LayoutOptions) -> PagedLayout {
    let mut layout = FlowLayout::new(options);

    let title = scope.title();
    layout.title_block(&title);
    for group in report.groups() {
        layout.group(group);
    }
    if scope.includes_grand_total() {
        layout.grand_total(report.totals());
    }

    debug!(
        "Paginated {} groups onto {} pages ({} images, {} skipped)",
        report.groups().len(),
        layout.cursor.pages.len(),
        layout.images.len(),
        layout.skipped_images
    );

    PagedLayout {
        geometry: options.geometry,
        title,
        pages: layout.cursor.pages,
        images: layout.images,
        group_starts: layout.group_starts,
        skipped_images: layout.skipped_images,
    }
}

impl<'a> FlowLayout<'a> {
    fn new(options: &'a LayoutOptions) -> Self {
        Self {
            options,
            cursor: LayoutCursor::new(options.geometry),
            images: Vec::new(),
            group_starts: Vec::new(),
            skipped_images: 0,
        }
    }

    fn body_style(&self) -> TextStyle {
        TextStyle {
            font_size: self.options.body_font_size,
            bold: false,
        }
    }

    fn bold_style(&self) -> TextStyle {
        TextStyle {
            font_size: self.options.body_font_size,
            bold: true,
        }
    }

    /// Draws a run of lines that must stay together on one page.
    fn block(&mut self, lines: Vec<String>, style: TextStyle, height: f64) {
        self.cursor.ensure_space(height * lines.len() as f64);
        for line in lines {
            self.cursor.text_line(line, style, height);
        }
    }

    fn wrapped(&self, text: &str, style: TextStyle) -> Vec<String> {
        wrap_text(text, self.options.geometry.usable_width(), |ch| {
            metrics::char_width_mm(ch, style.font_size, style.bold)
        })
    }

    fn title_block(&mut self, title: &str) {
        let style = TextStyle {
            font_size: self.options.title_font_size,
            bold: true,
        };
        let lines = self.wrapped(title, style);
        self.block(lines, style, self.options.heading_height);
    }

    fn group(&mut self, group: &Group) {
        let style = TextStyle {
            font_size: self.options.heading_font_size,
            bold: true,
        };
        let heading = format!("{}: {}", labels::GROUP_HEADING, group.cost_center());
        let lines = self.wrapped(&heading, style);

        let heading_height = self.options.heading_height * lines.len() as f64;
        self.cursor
            .ensure_space(heading_height + self.options.line_height);
        self.group_starts.push(GroupStart {
            cost_center: group.cost_center().to_string(),
            page_index: self.cursor.page,
        });
        for line in lines {
            self.cursor
                .text_line(line, style, self.options.heading_height);
        }

        for record in group.records() {
            self.record(record);
        }

        self.subtotal(group.subtotal());
        self.cursor.y += self.options.group_gap;
    }

    fn record_lines(&self, record: &Record) -> Vec<String> {
        let style = self.body_style();
        let fields = [
            (labels::PLATE, text_or_placeholder(record.plate()).to_string()),
            (labels::NAME, text_or_placeholder(record.name()).to_string()),
            (
                labels::DESCRIPTION,
                text_or_placeholder(record.description()).to_string(),
            ),
            (
                labels::CONSERVATION,
                text_or_placeholder(record.conservation_state()).to_string(),
            ),
            (labels::CURRENT_VALUE, format_currency(record.current_value())),
            (labels::MARKET_VALUE, format_currency(record.market_value())),
        ];

        fields
            .iter()
            .flat_map(|(label, value)| {
                self.wrapped(&format!("{}: {}", label, value), style)
            })
            .collect()
    }

    fn record(&mut self, record: &Record) {
        let style = self.body_style();
        for line in self.record_lines(record) {
            self.cursor.text_line(line, style, self.options.line_height);
        }

        let decoded = self.decode_images(record);
        if decoded.is_empty() {
            self.cursor.y += self.options.line_height;
        } else {
            self.image_rows(decoded);
        }
    }

    fn decode_images(&mut self, record: &Record) -> Vec<DynamicImage> {
        let mut decoded = Vec::new();
        for (index, payload) in record.images().iter().enumerate() {
            match decode_payload(payload) {
                Ok(image) => decoded.push(image),
                Err(err) => {
                    self.skipped_images += 1;
                    warn!(
                        "Skipping image {} of asset {}: {}",
                        index + 1,
                        text_or_placeholder(record.plate()),
                        err
                    );
                }
            }
        }
        decoded
    }

    fn image_rows(&mut self, images: Vec<DynamicImage>) {
        let left = self.options.geometry.left();
        let right = self.options.geometry.right();
        let gap = self.options.image_gap;

        self.cursor.x = left;
        let mut row_height: f64 = 0.0;

        for image in images {
            let (px_width, px_height) = image.dimensions();
            let (width, height) = self.options.image_display_size(px_width, px_height);

            if self.cursor.x > left + EPSILON && self.cursor.x + width > right + EPSILON {
                self.cursor.y += row_height + gap;
                self.cursor.x = left;
                row_height = 0.0;
            }

            if self.cursor.ensure_space(height) {
                row_height = 0.0;
            }

            let index = self.images.len();
            self.images.push(image);
            let rect = Rect::new(self.cursor.x, self.cursor.y, width, height);
            self.cursor.place(rect, DrawKind::Image { image: index });

            row_height = row_height.max(height);
            self.cursor.x += width + gap;
        }

        self.cursor.y += row_height + gap;
        self.cursor.x = left;
    }

    fn subtotal(&mut self, subtotal: Totals) {
        let lines = vec![
            labels::SUBTOTAL.to_string(),
            format!(
                "{}: {}",
                labels::CURRENT_VALUE,
                format_currency(subtotal.current_value)
            ),
            format!(
                "{}: {}",
                labels::MARKET_VALUE,
                format_currency(subtotal.market_value)
            ),
        ];
        let style = self.bold_style();
        self.block(lines, style, self.options.line_height);
    }

    fn grand_total(&mut self, totals: Totals) {
        let heading_style = TextStyle {
            font_size: self.options.heading_font_size,
            bold: true,
        };
        let lines = [
            format!(
                "{}: {}",
                labels::GRAND_TOTAL_CURRENT,
                format_currency(totals.current_value)
            ),
            format!(
                "{}: {}",
                labels::GRAND_TOTAL_MARKET,
                format_currency(totals.market_value)
            ),
        ];

        let height = self.options.heading_height + self.options.line_height * lines.len() as f64;
        self.cursor.ensure_space(height);
        self.cursor.text_line(
            labels::GRAND_TOTAL_HEADING.to_string(),
            heading_style,
            self.options.heading_height,
        );
        let style = self.bold_style();
        for line in lines {
            self.cursor.text_line(line, style, self.options.line_height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::elements::test_images::{bare_jpeg, png_data_uri};
    use crate::layout::PageMargins;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn texts(page: &Page) -> Vec<&str> {
        page.instructions()
            .iter()
            .filter_map(|instruction| match &instruction.kind {
                DrawKind::Text { text, .. } => Some(text.as_str()),
                DrawKind::Image { .. } => None,
            })
            .collect()
    }

    fn images(layout: &PagedLayout) -> Vec<(usize, Rect)> {
        layout
            .pages
            .iter()
            .enumerate()
            .flat_map(|(page, content)| {
                content
                    .instructions()
                    .iter()
                    .filter(|instruction| matches!(instruction.kind, DrawKind::Image { .. }))
                    .map(move |instruction| (page, instruction.rect))
            })
            .collect()
    }

    fn assert_within_bounds(layout: &PagedLayout) {
        for page in &layout.pages {
            for instruction in page.instructions() {
                assert!(
                    instruction.rect.fits_within(&layout.geometry),
                    "{:?} exceeds drawable area",
                    instruction
                );
            }
        }
    }

    #[test]
    fn lays_out_groups_in_report_order() {
        let report = aggregate(vec![
            Record::new().with_cost_center("A").with_current_value("10.5"),
            Record::new().with_cost_center("B").with_current_value("20"),
            Record::new().with_cost_center("A").with_current_value("5"),
        ]);
        let layout = paginate(&report, &ReportScope::All, &LayoutOptions::default());

        assert_eq!(layout.pages.len(), 1);
        let lines = texts(&layout.pages[0]);
        assert_eq!(lines[0], "Relatório Geral de Ativos");
        assert_eq!(lines[1], "Centro de Custo: A");
        assert!(lines.contains(&"Valor Atual: R$ 15.50"));
        assert!(lines.contains(&"Total Geral Valor Atual: R$ 35.50"));
        assert_eq!(lines.last(), Some(&"Total Geral Valor de Mercado: R$ 0.00"));

        let position_a = lines.iter().position(|line| *line == "Centro de Custo: A");
        let position_b = lines.iter().position(|line| *line == "Centro de Custo: B");
        assert!(position_a < position_b);
        assert_eq!(
            layout.group_starts,
            vec![
                GroupStart {
                    cost_center: "A".into(),
                    page_index: 0
                },
                GroupStart {
                    cost_center: "B".into(),
                    page_index: 0
                },
            ]
        );
    }

    #[test]
    fn scoped_layout_has_no_grand_total() {
        let report = aggregate(vec![Record::new().with_cost_center("TI")]);
        let layout = paginate(
            &report,
            &ReportScope::CostCenter("TI".into()),
            &LayoutOptions::default(),
        );
        let lines = texts(&layout.pages[0]);
        assert_eq!(lines[0], "Relatório de Ativos - TI");
        assert!(!lines.contains(&labels::GRAND_TOTAL_HEADING));
    }

    #[test]
    fn record_without_images_advances_one_line() {
        let options = LayoutOptions::default();
        let report = aggregate(vec![Record::new().with_cost_center("A")]);
        let layout = paginate(&report, &ReportScope::CostCenter("A".into()), &options);

        let page = &layout.pages[0];
        let market_line = page
            .instructions()
            .iter()
            .find(|instruction| {
                matches!(&instruction.kind, DrawKind::Text { text, .. } if text.starts_with("Valor de Mercado: R$"))
            })
            .expect("market value line");
        let subtotal_line = page
            .instructions()
            .iter()
            .find(|instruction| {
                matches!(&instruction.kind, DrawKind::Text { text, .. } if text == labels::SUBTOTAL)
            })
            .expect("subtotal line");

        let advance = subtotal_line.rect.y - market_line.rect.bottom();
        assert!((advance - options.line_height).abs() < 1e-9);
        assert!(layout.images.is_empty());
    }

    #[test]
    fn wraps_images_at_right_margin() {
        let options = LayoutOptions {
            image_width: 80.0,
            ..LayoutOptions::default()
        };
        let record = Record::new()
            .with_cost_center("A")
            .with_image(png_data_uri(40, 20))
            .with_image(bare_jpeg(40, 20))
            .with_image(png_data_uri(40, 20));
        let layout = paginate(&aggregate(vec![record]), &ReportScope::All, &options);

        let placed = images(&layout);
        assert_eq!(placed.len(), 3);
        assert_eq!(layout.skipped_images, 0);

        let (_, first) = placed[0];
        let (_, second) = placed[1];
        let (_, third) = placed[2];
        assert!((first.y - second.y).abs() < 1e-9, "first two share a row");
        assert!((third.x - options.geometry.left()).abs() < 1e-9);
        assert!((third.y - (first.y + first.height + options.image_gap)).abs() < 1e-9);
        for (_, rect) in placed {
            assert!(rect.right() <= options.geometry.right() + 1e-9);
        }
        assert_within_bounds(&layout);
    }

    #[test]
    fn corrupt_image_is_skipped_and_fields_still_drawn() {
        let record = Record::new()
            .with_cost_center("A")
            .with_plate("PAT-7")
            .with_image("data:image/png;base64,@@@@")
            .with_image(png_data_uri(10, 10));
        let layout = paginate(&aggregate(vec![record]), &ReportScope::All, &LayoutOptions::default());

        assert_eq!(layout.skipped_images, 1);
        assert_eq!(images(&layout).len(), 1);
        assert!(texts(&layout.pages[0]).contains(&"Placa: PAT-7"));
    }

    #[test]
    fn missing_fields_render_placeholders() {
        let layout = paginate(
            &aggregate(vec![Record::new()]),
            &ReportScope::All,
            &LayoutOptions::default(),
        );
        let lines = texts(&layout.pages[0]);
        assert!(lines.contains(&"Centro de Custo: Unassigned"));
        assert!(lines.contains(&"Nome: N/A"));
        assert!(lines.contains(&"Valor Atual: R$ 0.00"));
    }

    #[test]
    fn image_that_does_not_fit_moves_to_next_page_top() {
        let options = LayoutOptions {
            geometry: PageGeometry {
                width: 100.0,
                height: 120.0,
                margins: PageMargins::all(10.0),
            },
            image_width: 60.0,
            max_image_height: 60.0,
            ..LayoutOptions::default()
        };
        let record = Record::new()
            .with_cost_center("A")
            .with_image(png_data_uri(30, 30));
        let layout = paginate(&aggregate(vec![record]), &ReportScope::All, &options);

        let placed = images(&layout);
        assert_eq!(placed.len(), 1);
        let (page, rect) = placed[0];
        assert!(page > 0, "image should not fit under the text block");
        assert!((rect.y - options.geometry.top()).abs() < 1e-9);
        assert_within_bounds(&layout);
    }

    #[test]
    fn group_heading_stays_with_first_line() {
        let options = LayoutOptions::default();
        let records: Vec<Record> = (0..60)
            .map(|index| {
                Record::new()
                    .with_cost_center(format!("CC{}", index % 7))
                    .with_plate(format!("P{index}"))
            })
            .collect();
        let layout = paginate(&aggregate(records), &ReportScope::All, &options);

        assert!(layout.pages.len() > 1);
        for page in &layout.pages {
            let last = page.instructions().last().expect("pages are never blank");
            if let DrawKind::Text { text, .. } = &last.kind {
                assert!(!text.starts_with("Centro de Custo"), "orphaned heading {text}");
            }
        }
        assert_within_bounds(&layout);
    }

    #[test]
    fn oversized_cost_center_heading_flows_across_pages() {
        let cost_center = "X".repeat(3000);
        let report = aggregate(vec![Record::new()
            .with_cost_center(cost_center.as_str())
            .with_plate("P1")]);
        let layout = paginate(
            &report,
            &ReportScope::CostCenter(cost_center),
            &LayoutOptions::default(),
        );

        assert!(layout.pages.len() > 1);
        assert!(layout.pages.iter().all(|page| !page.is_empty()));
        assert_within_bounds(&layout);
        assert_eq!(layout.group_starts.len(), 1);

        let placed: Vec<&str> = layout.pages.iter().flat_map(texts).collect();
        assert!(placed.contains(&"Placa: P1"));
        assert_eq!(placed.last(), Some(&"Valor de Mercado: R$ 0.00"));
    }

    /// A layout whose cursor sits `room` millimetres above the bottom margin of a used page.
    fn layout_with_room(options: &LayoutOptions, room: f64) -> FlowLayout<'_> {
        let mut layout = FlowLayout::new(options);
        let style = layout.body_style();
        layout
            .cursor
            .text_line("anterior".to_string(), style, options.line_height);
        layout.cursor.y = options.geometry.bottom() - room;
        layout
    }

    fn totals(current: i64, market: i64) -> Totals {
        Totals {
            current_value: Decimal::from(current),
            market_value: Decimal::from(market),
        }
    }

    #[test]
    fn subtotal_at_page_end_moves_whole_to_next_page() {
        let options = LayoutOptions::default();
        let mut layout = layout_with_room(&options, 2.0 * options.line_height);
        layout.subtotal(totals(10, 7));

        let pages = &layout.cursor.pages;
        assert_eq!(pages.len(), 2);
        assert_eq!(texts(&pages[0]), vec!["anterior"]);
        assert_eq!(
            texts(&pages[1]),
            vec![
                "Total do Centro:",
                "Valor Atual: R$ 10.00",
                "Valor de Mercado: R$ 7.00"
            ]
        );
        let first = &pages[1].instructions()[0];
        assert!((first.rect.y - options.geometry.top()).abs() < 1e-9);
    }

    #[test]
    fn subtotal_that_fits_exactly_stays_on_page() {
        let options = LayoutOptions::default();
        let mut layout = layout_with_room(&options, 3.0 * options.line_height);
        layout.subtotal(totals(1, 1));

        assert_eq!(layout.cursor.pages.len(), 1);
        assert_eq!(texts(&layout.cursor.pages[0]).len(), 4);
    }

    #[test]
    fn grand_total_at_page_end_moves_whole_to_next_page() {
        let options = LayoutOptions::default();
        let room = options.heading_height + options.line_height;
        let mut layout = layout_with_room(&options, room);
        layout.grand_total(totals(35, 12));

        let pages = &layout.cursor.pages;
        assert_eq!(pages.len(), 2);
        assert_eq!(texts(&pages[0]), vec!["anterior"]);
        assert_eq!(
            texts(&pages[1]),
            vec![
                "Totais Gerais",
                "Total Geral Valor Atual: R$ 35.00",
                "Total Geral Valor de Mercado: R$ 12.00"
            ]
        );
        let first = &pages[1].instructions()[0];
        assert!((first.rect.y - options.geometry.top()).abs() < 1e-9);
    }

    fn arbitrary_record() -> impl Strategy<Value = Record> {
        (
            prop::sample::select(vec!["A", "B", "C"]),
            "[a-z ]{0,200}",
            prop::collection::vec((1u32..64, 1u32..64), 0..=3),
        )
            .prop_map(|(center, description, dims)| {
                let mut record = Record::new()
                    .with_cost_center(center)
                    .with_description(description);
                for (width, height) in dims {
                    record = record.with_image(png_data_uri(width, height));
                }
                record
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Nothing is drawn outside the drawable area and no page is left blank.
        #[test]
        fn prop_instructions_stay_within_page(
            records in prop::collection::vec(arbitrary_record(), 0..12),
            image_width in 10.0f64..150.0,
        ) {
            let options = LayoutOptions { image_width, ..LayoutOptions::default() };
            let layout = paginate(&aggregate(records), &ReportScope::All, &options);

            for page in &layout.pages {
                prop_assert!(!page.is_empty());
                for instruction in page.instructions() {
                    prop_assert!(instruction.rect.fits_within(&layout.geometry));
                }
            }
        }
    }
}
