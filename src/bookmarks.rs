//! PDF outline entries for cost-center groups, written with `lopdf`.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::layout::GroupStart;

/// Errors that can occur while embedding bookmarks into a rendered PDF document.
#[derive(Debug)]
pub enum BookmarkError {
    /// The PDF bytes could not be parsed or written by `lopdf`.
    Pdf(lopdf::Error),
    /// The trailer has no usable `/Root` catalog.
    MissingCatalog,
    /// A group refers to a page the document does not have.
    MissingPage {
        cost_center: String,
        /// 1-based page number.
        page_number: usize,
    },
}

impl From<lopdf::Error> for BookmarkError {
    fn from(err: lopdf::Error) -> Self {
        Self::Pdf(err)
    }
}

impl From<std::io::Error> for BookmarkError {
    fn from(err: std::io::Error) -> Self {
        Self::Pdf(err.into())
    }
}

impl std::fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf(err) => write!(f, "Failed to process PDF bytes: {err}"),
            Self::MissingCatalog => write!(f, "PDF catalog entry is missing"),
            Self::MissingPage {
                cost_center,
                page_number,
            } => write!(
                f,
                "Cost center '{cost_center}' starts on missing page {page_number}"
            ),
        }
    }
}

impl std::error::Error for BookmarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pdf(err) => Some(err),
            Self::MissingCatalog | Self::MissingPage { .. } => None,
        }
    }
}

struct OutlineEntry {
    object_id: ObjectId,
    page_ref: ObjectId,
    title: String,
}

/// Adds a flat outline with one entry per cost-center group pointing at its first page.
pub fn apply_group_bookmarks(
    pdf_bytes: &[u8],
    groups: &[GroupStart],
) -> Result<Vec<u8>, BookmarkError> {
    if groups.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let mut document = Document::load_mem(pdf_bytes)?;
    let pages: BTreeMap<u32, ObjectId> = document.get_pages();

    let mut entries = Vec::with_capacity(groups.len());
    for group in groups {
        let page_number = group.page_index + 1;
        let page_ref = u32::try_from(page_number)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or_else(|| BookmarkError::MissingPage {
                cost_center: group.cost_center.clone(),
                page_number,
            })?;
        entries.push(OutlineEntry {
            object_id: document.new_object_id(),
            page_ref,
            title: group.cost_center.clone(),
        });
    }

    let outlines_id = document.new_object_id();
    for (index, entry) in entries.iter().enumerate() {
        let mut dictionary = Dictionary::new();
        dictionary.set("Title", Object::string_literal(entry.title.as_str()));
        dictionary.set(
            "Dest",
            Object::Array(vec![
                Object::Reference(entry.page_ref),
                Object::Name("Fit".into()),
            ]),
        );
        dictionary.set("Parent", Object::Reference(outlines_id));
        if let Some(previous) = index.checked_sub(1).and_then(|prev| entries.get(prev)) {
            dictionary.set("Prev", Object::Reference(previous.object_id));
        }
        if let Some(next) = entries.get(index + 1) {
            dictionary.set("Next", Object::Reference(next.object_id));
        }
        document
            .objects
            .insert(entry.object_id, Object::Dictionary(dictionary));
    }

    let mut outlines = Dictionary::new();
    outlines.set("Type", Object::Name("Outlines".into()));
    outlines.set("Count", Object::Integer(entries.len() as i64));
    if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
        outlines.set("First", Object::Reference(first.object_id));
        outlines.set("Last", Object::Reference(last.object_id));
    }
    document
        .objects
        .insert(outlines_id, Object::Dictionary(outlines));

    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)?;
    document
        .objects
        .get_mut(&catalog_id)
        .and_then(|catalog| catalog.as_dict_mut().ok())
        .ok_or(BookmarkError::MissingCatalog)?
        .set("Outlines", Object::Reference(outlines_id));

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}
