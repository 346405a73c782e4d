//! `genpdf` document setup for the table backend.

use std::path::PathBuf;

use genpdf::error::{Error, ErrorKind};
use genpdf::style;
use genpdf::{self, Element, Margins, Mm, PageDecorator, Position, Size};

use crate::fonts;
use crate::layout::PageGeometry;

type FooterFactory = dyn Fn(usize) -> Box<dyn Element>;

/// Builder for `genpdf::Document` instances sized after a [`PageGeometry`].
#[derive(Default)]
pub struct DocumentBuilder {
    fonts_dir: Option<PathBuf>,
    title: Option<String>,
    paper_size: Option<Size>,
    margins: Option<Margins>,
    footer: Option<FooterSpec>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory searched first for the font family.
    pub fn with_fonts_dir(mut self, fonts_dir: Option<PathBuf>) -> Self {
        self.fonts_dir = fonts_dir;
        self
    }

    /// Document title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Takes paper size and margins from `geometry`.
    pub fn with_geometry(mut self, geometry: &PageGeometry) -> Self {
        let PageGeometry {
            width,
            height,
            margins,
        } = *geometry;
        self.paper_size = Some(Size::new(width, height));
        self.margins = Some(Margins::trbl(
            margins.top,
            margins.right,
            margins.bottom,
            margins.left,
        ));
        self
    }

    /// Configures a footer with a fixed height rendered on every page.
    pub fn with_footer<F, E>(mut self, height: impl Into<Mm>, footer: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        self.footer = Some(FooterSpec {
            height: height.into(),
            factory: Box::new(move |page| Box::new(footer(page)) as Box<dyn Element>),
        });
        self
    }

    pub fn build(self) -> Result<genpdf::Document, Error> {
        let font_family = fonts::font_family(self.fonts_dir.as_deref())?;
        let mut document = genpdf::Document::new(font_family);

        if let Some(title) = self.title {
            document.set_title(title);
        }
        if let Some(paper_size) = self.paper_size {
            document.set_paper_size(paper_size);
        }

        document.set_page_decorator(FooterDecorator {
            page: 0,
            margins: self.margins,
            footer: self.footer,
        });

        Ok(document)
    }
}

struct FooterSpec {
    height: Mm,
    factory: Box<FooterFactory>,
}

struct FooterDecorator {
    page: usize,
    margins: Option<Margins>,
    footer: Option<FooterSpec>,
}

impl PageDecorator for FooterDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;

        if let Some(margins) = self.margins {
            area.add_margins(margins);
        }

        if let Some(footer) = &self.footer {
            let available = area.size().height;
            if footer.height > available {
                return Err(Error::new(
                    "Footer height exceeds available space",
                    ErrorKind::InvalidData,
                ));
            }

            let mut footer_area = area.clone();
            footer_area.add_offset(Position::new(0, available - footer.height));
            let mut element = (footer.factory)(self.page);
            let result = element.render(context, footer_area, style)?;
            if result.has_more {
                return Err(Error::new(
                    "Footer element does not fit into the reserved space",
                    ErrorKind::PageSizeExceeded,
                ));
            }

            area.set_height(available - footer.height);
        }

        Ok(area)
    }
}
