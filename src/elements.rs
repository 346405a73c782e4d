//! Image decoding for record payloads and the `genpdf` elements built on top of it.
//!
//! Payloads are decoded into RGB images up front so both emitters can embed them: `genpdf`
//! rejects images carrying an alpha channel and printpdf handles them poorly.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use image::{DynamicImage, GenericImageView, ImageFormat};

use genpdf::elements::Image;
use genpdf::error::{Context as _, Error, ErrorKind};
use genpdf::style::Style;
use genpdf::{render, Alignment, Element, Mm, RenderResult, Scale, Size};

use crate::model::ImagePayload;

/// Resolution assumed when converting pixels to millimetres.
pub const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

/// Size of `image` in millimetres when printed at `dpi`.
pub fn natural_size_mm(image: &DynamicImage, dpi: f64) -> (f64, f64) {
    let (px_width, px_height) = image.dimensions();
    (
        MM_PER_INCH * f64::from(px_width) / dpi,
        MM_PER_INCH * f64::from(px_height) / dpi,
    )
}

/// Picks the decoder for a payload marker.
///
/// Payloads without a marker are JPEG.  `None` means the marker names no known format and the
/// format has to be guessed from the bytes.
pub fn format_for_marker(marker: Option<&str>) -> Option<ImageFormat> {
    let Some(marker) = marker else {
        return Some(ImageFormat::Jpeg);
    };

    let marker = marker.to_ascii_lowercase();
    if marker.contains("png") {
        Some(ImageFormat::Png)
    } else if marker.contains("jpeg") || marker.contains("jpg") {
        Some(ImageFormat::Jpeg)
    } else if marker.contains("gif") {
        Some(ImageFormat::Gif)
    } else if marker.contains("webp") {
        Some(ImageFormat::WebP)
    } else if marker.contains("bmp") {
        Some(ImageFormat::Bmp)
    } else {
        None
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>, Error> {
    let compact: String = data.chars().filter(|ch| !ch.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .or_else(|_| STANDARD_NO_PAD.decode(compact.as_bytes()))
        .map_err(|err| {
            Error::new(
                format!("Image payload is not valid base64: {}", err),
                ErrorKind::InvalidData,
            )
        })
}

/// Decodes a record image payload into an RGB image.
pub fn decode_payload(payload: &ImagePayload<'_>) -> Result<DynamicImage, Error> {
    let bytes = decode_base64(payload.data())?;
    if bytes.is_empty() {
        return Err(Error::new("Image payload is empty", ErrorKind::InvalidData));
    }

    let decoded = match format_for_marker(payload.marker()) {
        Some(format) => image::load_from_memory_with_format(&bytes, format)
            .with_context(|| format!("Failed to decode {:?} image payload", format))?,
        None => image::load_from_memory(&bytes).context("Failed to decode image payload")?,
    };

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::new(
            "Decoded image has no pixels",
            ErrorKind::InvalidData,
        ));
    }

    Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
}

/// An image scaled to a fixed width for the table gallery rows.
///
/// The aspect ratio is kept; the height follows from the requested width.
pub struct GalleryImage {
    image: Image,
    natural_size: (f64, f64),
    width_mm: f64,
}

impl GalleryImage {
    /// Wraps an already decoded RGB image.
    pub fn new(image: DynamicImage, width_mm: f64) -> Result<Self, Error> {
        let natural_size = natural_size_mm(&image, DEFAULT_IMAGE_DPI);
        let mut image = Image::from_dynamic_image(image)?;
        image.set_alignment(Alignment::Center);
        let mut element = Self {
            image,
            natural_size,
            width_mm,
        };
        element.apply_width();
        Ok(element)
    }

    /// Rendered size in millimetres.
    pub fn display_size(&self) -> Size {
        let (natural_width, natural_height) = self.natural_size;
        let scale = self.scale();
        Size::new(
            mm_from_f64(natural_width * scale),
            mm_from_f64(natural_height * scale),
        )
    }

    fn scale(&self) -> f64 {
        let natural = self.natural_size.0;
        if natural > f64::EPSILON {
            self.width_mm / natural
        } else {
            1.0
        }
    }

    fn apply_width(&mut self) {
        let scale = self.scale();
        self.image.set_scale(Scale::new(scale, scale));
    }
}

impl Element for GalleryImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        if mm_to_f64(self.display_size().width) > mm_to_f64(area.size().width) {
            let available = mm_to_f64(area.size().width);
            let scale = available / self.natural_size.0.max(f64::EPSILON);
            self.image.set_scale(Scale::new(scale, scale));
        } else {
            self.apply_width();
        }
        self.image.render(context, area, style)
    }
}
