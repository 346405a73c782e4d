//! Report layout: turning an aggregated [`Report`](crate::aggregate::Report) into placed content.
//!
//! Two strategies share the labels and formatting defined here:
//!
//! - [`flow`] positions every text line and image on fixed-size pages with an explicit cursor,
//!   starting new pages so that nothing is clipped and blocks stay whole where they fit.
//! - [`table`] composes an ordered sequence of table row blocks and leaves pagination to the
//!   document backend.

pub mod flow;
pub mod metrics;
pub mod table;

use rust_decimal::{Decimal, RoundingStrategy};

pub use flow::{paginate, DrawInstruction, DrawKind, GroupStart, Page, PagedLayout, TextStyle};
pub use table::{compose_rows, RowBlock, RowSequence};

/// Fixed strings printed in the report.
pub mod labels {
    pub const GROUP_HEADING: &str = "Centro de Custo";
    pub const PLATE: &str = "Placa";
    pub const NAME: &str = "Nome";
    pub const DESCRIPTION: &str = "Descrição";
    pub const CONSERVATION: &str = "Conservação";
    pub const CURRENT_VALUE: &str = "Valor Atual";
    pub const MARKET_VALUE: &str = "Valor de Mercado";
    pub const SUBTOTAL: &str = "Total do Centro:";
    pub const GRAND_TOTAL_HEADING: &str = "Totais Gerais";
    pub const GRAND_TOTAL_CURRENT: &str = "Total Geral Valor Atual";
    pub const GRAND_TOTAL_MARKET: &str = "Total Geral Valor de Mercado";
    pub const NOT_AVAILABLE: &str = "N/A";
    pub const CURRENCY_PREFIX: &str = "R$";
}

/// Renders an amount with the currency prefix and exactly two decimals.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{} {:.2}", labels::CURRENCY_PREFIX, rounded)
}

/// Returns the text value or the `N/A` placeholder.
pub fn text_or_placeholder(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => labels::NOT_AVAILABLE,
    }
}

/// Page margins in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageMargins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl PageMargins {
    /// Same margin on every side.
    pub const fn all(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// Physical page size and margins, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margins: PageMargins,
}

impl PageGeometry {
    /// A4 portrait with 15 mm margins.
    pub const fn a4() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margins: PageMargins::all(15.0),
        }
    }

    pub fn left(&self) -> f64 {
        self.margins.left
    }

    pub fn right(&self) -> f64 {
        self.width - self.margins.right
    }

    pub fn top(&self) -> f64 {
        self.margins.top
    }

    pub fn bottom(&self) -> f64 {
        self.height - self.margins.bottom
    }

    pub fn usable_width(&self) -> f64 {
        self.right() - self.left()
    }

    pub fn usable_height(&self) -> f64 {
        self.bottom() - self.top()
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// Axis-aligned box measured from the top-left page corner, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether the box lies inside the drawable area of `geometry`.
    pub fn fits_within(&self, geometry: &PageGeometry) -> bool {
        self.x >= geometry.left() - EPSILON
            && self.y >= geometry.top() - EPSILON
            && self.right() <= geometry.right() + EPSILON
            && self.bottom() <= geometry.bottom() + EPSILON
    }
}

/// Tolerance for comparisons of millimetre positions.
pub(crate) const EPSILON: f64 = 1e-6;

/// Tunables of the flow layout.  All lengths are in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutOptions {
    pub geometry: PageGeometry,
    /// Vertical advance of a body text line.
    pub line_height: f64,
    /// Vertical advance of the title and section headings.
    pub heading_height: f64,
    pub body_font_size: f64,
    pub heading_font_size: f64,
    pub title_font_size: f64,
    /// Display width of record images before they are constrained.
    pub image_width: f64,
    /// Upper bound of an image's display height.
    pub max_image_height: f64,
    /// Gap between images and after an image row.
    pub image_gap: f64,
    /// Extra space after each group.
    pub group_gap: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::a4(),
            line_height: 6.0,
            heading_height: 10.0,
            body_font_size: 10.0,
            heading_font_size: 13.0,
            title_font_size: 16.0,
            image_width: 40.0,
            max_image_height: 40.0,
            image_gap: 4.0,
            group_gap: 8.0,
        }
    }
}

impl LayoutOptions {
    /// Display size of an image with the given pixel dimensions.
    ///
    /// The image is scaled to [`LayoutOptions::image_width`] keeping its aspect ratio, then shrunk
    /// until it fits both the maximum image height and the drawable area.
    pub fn image_display_size(&self, px_width: u32, px_height: u32) -> (f64, f64) {
        let ratio = f64::from(px_height.max(1)) / f64::from(px_width.max(1));
        let mut width = self.image_width.min(self.geometry.usable_width());
        let mut height = width * ratio;

        let max_height = self.max_image_height.min(self.geometry.usable_height());
        if height > max_height {
            let shrink = max_height / height;
            width *= shrink;
            height = max_height;
        }

        (width, height)
    }
}

/// Greedy word wrap to lines at most `max_width` wide, measuring each character with
/// `char_width`.  Words wider than a line are split; a line always holds at least one
/// character.  Always returns at least one (possibly empty) line.
pub fn wrap_text<F>(text: &str, max_width: f64, char_width: F) -> Vec<String>
where
    F: Fn(char) -> f64,
{
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;
    let space = char_width(' ');

    for word in text.split_whitespace() {
        let word_width: f64 = word.chars().map(&char_width).sum();
        let needed = if current.is_empty() {
            word_width
        } else {
            current_width + space + word_width
        };

        if needed <= max_width + EPSILON {
            if !current.is_empty() {
                current.push(' ');
                current_width += space;
            }
            current.push_str(word);
            current_width += word_width;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
        }
        if word_width <= max_width + EPSILON {
            current.push_str(word);
            current_width = word_width;
            continue;
        }

        for ch in word.chars() {
            let width = char_width(ch);
            if !current.is_empty() && current_width + width > max_width + EPSILON {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            current.push(ch);
            current_width += width;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
