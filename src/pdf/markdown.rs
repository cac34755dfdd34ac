//! Markdown reconstruction from a page's span structure.
//!
//! Lines become paragraphs by vertical proximity, paragraph headings are
//! inferred from font size relative to the page median, and span styling
//! is taken from font names. Tables found on the page are appended as
//! pipe tables after the paragraphs.

use crate::pdf::model::{PageText, TextLine, TextSpan};
use crate::pdf::tables::{TableFinder, TableScan};

/// Font size assumed when a page or line carries no sized text.
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Maximum distance between consecutive line tops within one paragraph.
pub const PARAGRAPH_GAP: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    None,
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    /// Classify a paragraph by its first line's size; every comparison is
    /// strictly greater-than.
    pub fn classify(size: f32, normal: f32) -> Self {
        if size > normal * 1.5 {
            HeadingLevel::H1
        } else if size > normal * 1.2 {
            HeadingLevel::H2
        } else if size > normal * 1.1 {
            HeadingLevel::H3
        } else {
            HeadingLevel::None
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            HeadingLevel::None => "",
            HeadingLevel::H1 => "# ",
            HeadingLevel::H2 => "## ",
            HeadingLevel::H3 => "### ",
        }
    }
}

/// A rendered line ready for paragraph grouping.
#[derive(Debug, Clone, PartialEq)]
struct MarkdownLine {
    text: String,
    top: f32,
    size: f32,
}

/// Median of the values; the mean of the middle pair for even counts.
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Emphasize a span's trimmed text from its font name. Blank spans yield
/// `None`.
pub fn format_span(span: &TextSpan) -> Option<String> {
    let text = span.text.trim();
    if text.is_empty() {
        return None;
    }
    let formatted = match (span.is_bold(), span.is_italic()) {
        (true, true) => format!("***{}***", text),
        (true, false) => format!("**{}**", text),
        (false, true) => format!("*{}*", text),
        (false, false) => text.to_string(),
    };
    Some(formatted)
}

fn render_line(line: &TextLine) -> Option<MarkdownLine> {
    let mut text = String::new();
    let mut sizes = Vec::new();
    for span in &line.spans {
        if let Some(formatted) = format_span(span) {
            text.push_str(&formatted);
            text.push(' ');
            sizes.push(span.size);
        }
    }

    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(MarkdownLine {
        text: text.to_string(),
        top: line.bbox.y0,
        size: median(&sizes).unwrap_or(DEFAULT_FONT_SIZE),
    })
}

fn group_paragraphs(lines: Vec<MarkdownLine>) -> Vec<Vec<MarkdownLine>> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<MarkdownLine> = Vec::new();
    let mut prev_top: Option<f32> = None;

    for line in lines {
        if let Some(prev) = prev_top {
            if (line.top - prev).abs() > PARAGRAPH_GAP {
                paragraphs.push(std::mem::take(&mut current));
            }
        }
        prev_top = Some(line.top);
        current.push(line);
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn table_fragments(scan: &TableScan, fragments: &mut Vec<String>) {
    for table in scan.tables() {
        fragments.push("\n".to_string());
        for (i, row) in table.extract().iter().enumerate() {
            let cells: Vec<&str> = row.iter().map(|c| c.trim()).collect();
            fragments.push(format!("| {} |", cells.join(" | ")));
            if i == 0 {
                let separator = vec!["---"; row.len()].join(" | ");
                fragments.push(format!("| {} |", separator));
            }
        }
        fragments.push("\n".to_string());
    }
}

/// Render one page given an already computed table scan.
pub fn render_markdown(page: &PageText, tables: &TableScan) -> String {
    let lines: Vec<MarkdownLine> = page.lines().filter_map(render_line).collect();

    let sizes: Vec<f32> = lines.iter().map(|l| l.size).collect();
    let normal = median(&sizes).unwrap_or(DEFAULT_FONT_SIZE);

    let mut fragments = Vec::new();
    for paragraph in group_paragraphs(lines) {
        let Some(first) = paragraph.first() else {
            continue;
        };
        let heading = HeadingLevel::classify(first.size, normal);
        let body: Vec<&str> = paragraph.iter().map(|l| l.text.as_str()).collect();
        fragments.push(format!("{}{}\n", heading.prefix(), body.join(" ")));
    }

    table_fragments(tables, &mut fragments);
    fragments.join("\n")
}

/// Render one page, running the table finder. A failed scan is logged and
/// contributes nothing.
pub fn render_page(page_index: u32, page: &PageText, finder: &dyn TableFinder) -> String {
    let scan = finder.find_tables(page);
    if let TableScan::Failed(reason) = &scan {
        tracing::debug!(page = page_index, reason = %reason, "table detection failed");
    }
    render_markdown(page, &scan)
}
