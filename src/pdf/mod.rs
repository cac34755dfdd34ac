//! PDF processing layer
//!
//! This module provides PDF reading, markdown reconstruction and editing on
//! top of PDFium.

pub mod editor;
pub mod engine;
pub mod layout;
pub mod markdown;
pub mod model;
pub mod reader;
pub mod search;
pub mod tables;

pub use editor::{
    add_text, annotate_rect, delete_text_by_bbox, fallback_font, highlight_text, insert_image,
    parse_hex_color, replace_text, Base14Font, EditSummary,
};
pub use engine::{create_pdfium, read_pdf_file, write_atomically};
pub use layout::{assemble_blocks, extract_page_text};
pub use markdown::{render_markdown, render_page, HeadingLevel};
pub use model::{Glyph, PageText, Rect, TextBlock, TextLine, TextSpan};
pub use reader::{
    extract_blocks, extract_layout, extract_markdown, extract_text, get_metadata,
    list_annotations, AnnotationEntry, DocumentMetadata, LayoutSpan, PageBlocks, PageContent,
};
pub use search::{find_occurrences, Occurrence};
pub use tables::{AlignedColumnFinder, NoTableFinder, Table, TableFinder, TableScan};
