//! Read-only PDF operations built on PDFium.
//!
//! Every function takes the raw document bytes and an optional password,
//! opens its own PDFium instance and releases it before returning.

use crate::error::{Error, Result};
use crate::pdf::engine::{
    create_pdfium, ensure_pdf_header, get_page, load_document, page_count, select_pages,
    to_top_left,
};
use crate::pdf::layout::extract_page_text;
use crate::pdf::markdown::render_page;
use crate::pdf::model::{Rect, TextBlock};
use crate::pdf::tables::TableFinder;
use pdfium_render::prelude::*;
use serde::Serialize;

/// Document information dictionary plus page count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    #[serde(rename = "creationDate")]
    pub creation_date: Option<String>,
    #[serde(rename = "modDate")]
    pub modification_date: Option<String>,
    pub page_count: u32,
}

/// Text content of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageContent {
    pub page: u32,
    pub content: String,
}

/// Block structure of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageBlocks {
    pub page: u32,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<TextBlock>,
}

/// A span with its position, for layout-aware consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSpan {
    pub page: u32,
    pub text: String,
    pub bbox: Rect,
    pub font: String,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationEntry {
    pub page: u32,
    /// PDF annotation subtype, e.g. `Highlight`.
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub bbox: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Open the document and run `f` over each selected page.
fn map_pages<T>(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
    mut f: impl FnMut(u32, &PdfPage) -> Result<T>,
) -> Result<Vec<T>> {
    ensure_pdf_header(data)?;
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, data, password)?;
    let selected = select_pages(pages, page_count(&document))?;

    let mut out = Vec::with_capacity(selected.len());
    for index in selected {
        let page = get_page(&document, index)?;
        out.push(f(index, &page)?);
    }
    Ok(out)
}

pub fn get_metadata(data: &[u8], password: Option<&str>) -> Result<DocumentMetadata> {
    ensure_pdf_header(data)?;
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, data, password)?;
    let meta = document.metadata();
    let tag = |t: PdfDocumentMetadataTagType| {
        meta.get(t)
            .map(|v| v.value().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(DocumentMetadata {
        title: tag(PdfDocumentMetadataTagType::Title),
        author: tag(PdfDocumentMetadataTagType::Author),
        subject: tag(PdfDocumentMetadataTagType::Subject),
        keywords: tag(PdfDocumentMetadataTagType::Keywords),
        creator: tag(PdfDocumentMetadataTagType::Creator),
        producer: tag(PdfDocumentMetadataTagType::Producer),
        creation_date: tag(PdfDocumentMetadataTagType::CreationDate),
        modification_date: tag(PdfDocumentMetadataTagType::ModificationDate),
        page_count: page_count(&document),
    })
}

/// Plain text of each selected page, in PDFium's reading order.
pub fn extract_text(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
) -> Result<Vec<PageContent>> {
    map_pages(data, password, pages, |index, page| {
        let text = page.text().map_err(|e| Error::Pdfium {
            reason: format!("Failed to load text of page {}: {}", index, e),
        })?;
        Ok(PageContent {
            page: index,
            content: text.all(),
        })
    })
}

pub fn extract_markdown(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
    finder: &dyn TableFinder,
) -> Result<Vec<PageContent>> {
    map_pages(data, password, pages, |index, page| {
        let structure = extract_page_text(page)?;
        Ok(PageContent {
            page: index,
            content: render_page(index, &structure, finder),
        })
    })
}

pub fn extract_blocks(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
) -> Result<Vec<PageBlocks>> {
    map_pages(data, password, pages, |index, page| {
        let structure = extract_page_text(page)?;
        Ok(PageBlocks {
            page: index,
            width: structure.width,
            height: structure.height,
            blocks: structure.blocks,
        })
    })
}

pub fn extract_layout(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
) -> Result<Vec<LayoutSpan>> {
    let per_page = map_pages(data, password, pages, |index, page| {
        let structure = extract_page_text(page)?;
        Ok(structure
            .spans()
            .map(|s| LayoutSpan {
                page: index,
                text: s.text.clone(),
                bbox: s.bbox,
                font: s.font.clone(),
                size: s.size,
            })
            .collect::<Vec<_>>())
    })?;
    Ok(per_page.into_iter().flatten().collect())
}

/// List annotations on the selected pages. Popups belong to their parent
/// annotation and are skipped.
pub fn list_annotations(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
) -> Result<Vec<AnnotationEntry>> {
    let per_page = map_pages(data, password, pages, |index, page| {
        let height = page.height().value;
        let mut entries = Vec::new();
        for annotation in page.annotations().iter() {
            let ann_type = annotation.annotation_type();
            if ann_type == PdfPageAnnotationType::Popup {
                continue;
            }

            let bbox = annotation
                .bounds()
                .map(|r| to_top_left(&r, height))
                .unwrap_or_default();

            entries.push(AnnotationEntry {
                page: index,
                kind: annotation_subtype(ann_type).to_string(),
                text: annotation.contents().unwrap_or_default(),
                bbox,
                author: annotation.creator().filter(|s| !s.is_empty()),
            });
        }
        Ok(entries)
    })?;
    Ok(per_page.into_iter().flatten().collect())
}

/// PDF `/Subtype` name of an annotation type.
pub fn annotation_subtype(ann_type: PdfPageAnnotationType) -> &'static str {
    match ann_type {
        PdfPageAnnotationType::Text => "Text",
        PdfPageAnnotationType::Link => "Link",
        PdfPageAnnotationType::FreeText => "FreeText",
        PdfPageAnnotationType::Line => "Line",
        PdfPageAnnotationType::Square => "Square",
        PdfPageAnnotationType::Circle => "Circle",
        PdfPageAnnotationType::Polygon => "Polygon",
        PdfPageAnnotationType::Polyline => "PolyLine",
        PdfPageAnnotationType::Highlight => "Highlight",
        PdfPageAnnotationType::Underline => "Underline",
        PdfPageAnnotationType::Squiggly => "Squiggly",
        PdfPageAnnotationType::Strikeout => "StrikeOut",
        PdfPageAnnotationType::Stamp => "Stamp",
        PdfPageAnnotationType::Caret => "Caret",
        PdfPageAnnotationType::Ink => "Ink",
        PdfPageAnnotationType::Popup => "Popup",
        PdfPageAnnotationType::FileAttachment => "FileAttachment",
        PdfPageAnnotationType::Sound => "Sound",
        PdfPageAnnotationType::Movie => "Movie",
        PdfPageAnnotationType::Widget => "Widget",
        PdfPageAnnotationType::Screen => "Screen",
        PdfPageAnnotationType::PrinterMark => "PrinterMark",
        PdfPageAnnotationType::TrapNet => "TrapNet",
        PdfPageAnnotationType::Watermark => "Watermark",
        PdfPageAnnotationType::ThreeD => "3D",
        PdfPageAnnotationType::RichMedia => "RichMedia",
        PdfPageAnnotationType::XfaWidget => "XFAWidget",
        PdfPageAnnotationType::Redacted => "Redact",
        PdfPageAnnotationType::Unknown => "Unknown",
    }
}
