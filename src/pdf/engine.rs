//! PDFium binding and the small set of document primitives every tool
//! shares: load, page lookup, coordinate conversion and saving.

use crate::error::{Error, Result};
use crate::pdf::model::Rect;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::Path;

/// Environment variable naming a directory that holds the PDFium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
pub fn create_pdfium() -> Result<Pdfium> {
    let mut dirs: Vec<String> = Vec::new();
    if let Ok(dir) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !dir.trim().is_empty() {
            dirs.push(dir);
        }
    }
    dirs.push("./".to_string());
    dirs.push("/opt/pdfium/lib".to_string());

    for dir in &dirs {
        let lib = Pdfium::pdfium_platform_library_name_at_path(dir);
        if let Ok(bindings) = Pdfium::bind_to_library(lib) {
            tracing::debug!(dir = %dir, "bound PDFium library");
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| Error::Pdfium {
        reason: format!("Failed to initialize PDFium: {}", e),
    })?;
    Ok(Pdfium::new(bindings))
}

/// Reject data that does not start with a PDF header.
pub fn ensure_pdf_header(data: &[u8]) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(())
}

/// Read a PDF file from disk, checking existence and header.
pub fn read_pdf_file(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path)?;
    ensure_pdf_header(&data)?;
    Ok(data)
}

/// Open a document held in memory.
pub fn load_document<'a>(
    pdfium: &'a Pdfium,
    data: &'a [u8],
    password: Option<&str>,
) -> Result<PdfDocument<'a>> {
    ensure_pdf_header(data)?;
    pdfium
        .load_pdf_from_byte_slice(data, password)
        .map_err(map_pdfium_error)
}

/// Map PDFium errors to our error type
pub fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::PasswordRequired
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

/// Resolve a zero-indexed page selection. `None` or an empty list selects
/// every page; out-of-range indices are rejected.
pub fn select_pages(pages: Option<&[u32]>, page_count: u32) -> Result<Vec<u32>> {
    match pages {
        Some(list) if !list.is_empty() => {
            if let Some(&bad) = list.iter().find(|&&p| p >= page_count) {
                return Err(Error::PageOutOfBounds {
                    page: bad,
                    total: page_count,
                });
            }
            Ok(list.to_vec())
        }
        _ => Ok((0..page_count).collect()),
    }
}

/// Number of pages in a document.
pub fn page_count(document: &PdfDocument) -> u32 {
    document.pages().len() as u32
}

/// Fetch a page by zero-based index.
pub fn get_page<'a>(document: &PdfDocument<'a>, index: u32) -> Result<PdfPage<'a>> {
    let total = page_count(document);
    if index >= total {
        return Err(Error::PageOutOfBounds { page: index, total });
    }

    document
        .pages()
        .get(index as u16)
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to get page {}: {}", index, e),
        })
}

/// Convert a PDFium rectangle (bottom-left origin) into top-left page space.
pub fn to_top_left(rect: &PdfRect, page_height: f32) -> Rect {
    Rect::new(
        rect.left().value,
        page_height - rect.top().value,
        rect.right().value,
        page_height - rect.bottom().value,
    )
}

/// Convert a top-left page-space rectangle into a PDFium rectangle.
pub fn to_pdf_rect(rect: &Rect, page_height: f32) -> PdfRect {
    PdfRect::new_from_values(
        page_height - rect.y1,
        rect.x0,
        page_height - rect.y0,
        rect.x1,
    )
}

/// Pack a colour into `0xRRGGBB`.
pub fn color_to_rgb(color: &PdfColor) -> u32 {
    ((color.red() as u32) << 16) | ((color.green() as u32) << 8) | color.blue() as u32
}

/// Unpack `0xRRGGBB` into an opaque PDFium colour.
pub fn rgb_to_color(rgb: u32) -> PdfColor {
    PdfColor::new(
        ((rgb >> 16) & 0xFF) as u8,
        ((rgb >> 8) & 0xFF) as u8,
        (rgb & 0xFF) as u8,
        255,
    )
}

/// Serialize a document to bytes.
pub fn save_document(document: &PdfDocument) -> Result<Vec<u8>> {
    document.save_to_bytes().map_err(|e| Error::Pdfium {
        reason: format!("Failed to save modified PDF: {}", e),
    })
}

/// Replace `path` with `data` via a temporary file in the same directory,
/// so a failed write never leaves a truncated PDF behind.
pub fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(".pdf-tools-")
        .suffix(".pdf")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pdf_detection() {
        assert!(matches!(
            ensure_pdf_header(b"not a pdf"),
            Err(Error::InvalidPdf { .. })
        ));
        assert!(ensure_pdf_header(b"%PDF-1.7").is_ok());
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_pdf_file(Path::new("/nonexistent/path/file.pdf"));
        assert!(matches!(result, Err(Error::PdfNotFound { .. })));
    }

    #[test]
    fn test_select_pages_defaults_to_all() {
        assert_eq!(select_pages(None, 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(select_pages(Some(&[]), 2).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_select_pages_keeps_order_and_rejects_out_of_range() {
        assert_eq!(select_pages(Some(&[2, 0]), 3).unwrap(), vec![2, 0]);
        assert!(matches!(
            select_pages(Some(&[0, 3]), 3),
            Err(Error::PageOutOfBounds { page: 3, total: 3 })
        ));
    }

    #[test]
    fn test_rgb_round_trip_through_pdf_color() {
        let color = rgb_to_color(0x12AB34);
        assert_eq!(color_to_rgb(&color), 0x12AB34);
    }

    #[test]
    fn test_write_atomically_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"old").unwrap();

        write_atomically(&path, b"%PDF-new").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-new");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
