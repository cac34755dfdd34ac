//! Span extraction: turns the engine's per-character stream into
//! blocks, lines and spans.
//!
//! Glyphs are consumed in content-stream order. A span ends on a font or
//! size change or a horizontal gap wider than one em; a line ends on an
//! engine line feed, a baseline shift or a jump back to the left; a block
//! ends when the vertical gap to the previous line exceeds that line's
//! height.

use crate::error::{Error, Result};
use crate::pdf::engine::{color_to_rgb, to_top_left};
use crate::pdf::model::{Glyph, PageText, Rect, TextBlock, TextLine, TextSpan};
use pdfium_render::prelude::*;

/// Horizontal gap (in ems) that splits a span.
const SPAN_GAP_EM: f32 = 1.0;

/// Baseline shift (in ems) that starts a new line.
const BASELINE_SHIFT_EM: f32 = 0.5;

/// Read every character on a page with its font, size, position and colour.
///
/// Failure to load the page's text layer is fatal: nothing downstream can
/// work without it.
pub fn collect_glyphs(page: &PdfPage) -> Result<Vec<Glyph>> {
    let page_height = page.height().value;
    let text = page.text().map_err(|e| Error::Pdfium {
        reason: format!("Failed to load page text: {}", e),
    })?;

    let mut glyphs = Vec::new();
    for ch in text.chars().iter() {
        let c = match ch.unicode_char() {
            Some(c) => c,
            None => continue,
        };

        let bbox = ch
            .loose_bounds()
            .map(|r| to_top_left(&r, page_height))
            .unwrap_or_default();
        let origin = ch
            .origin()
            .map(|(x, y)| (x.value, page_height - y.value))
            .unwrap_or((bbox.x0, bbox.y1));
        let color = ch.fill_color().map(|c| color_to_rgb(&c)).unwrap_or(0);

        glyphs.push(Glyph {
            ch: c,
            font: ch.font_name(),
            size: ch.scaled_font_size().value,
            bbox,
            origin,
            color,
        });
    }

    Ok(glyphs)
}

/// Extract the block/line/span structure of a page.
pub fn extract_page_text(page: &PdfPage) -> Result<PageText> {
    let glyphs = collect_glyphs(page)?;
    Ok(PageText {
        width: page.width().value,
        height: page.height().value,
        blocks: assemble_blocks(&glyphs),
    })
}

#[derive(Default)]
struct Assembler {
    blocks: Vec<TextBlock>,
    block_lines: Vec<TextLine>,
    line_spans: Vec<TextSpan>,
    span: Option<TextSpan>,
    baseline: Option<f32>,
    last_x1: f32,
}

impl Assembler {
    fn push(&mut self, g: &Glyph) {
        if g.ch == '\n' || g.ch == '\r' {
            self.finish_line();
            return;
        }

        if g.ch.is_whitespace() {
            // Whitespace never opens a span and never widens its box.
            if let Some(span) = self.span.as_mut() {
                span.text.push(' ');
            }
            return;
        }

        if g.ch.is_control() {
            return;
        }

        if let Some(baseline) = self.baseline {
            let em = self.current_size().max(g.size).max(1.0);
            let shifted = (g.origin.1 - baseline).abs() > em * BASELINE_SHIFT_EM;
            let wrapped = g.bbox.x0 < self.last_x1 - em;
            if shifted || wrapped {
                self.finish_line();
            }
        }

        if let Some(span) = &self.span {
            let em = span.size.max(g.size).max(1.0);
            let restyled = span.font != g.font || (span.size - g.size).abs() > 0.01;
            let gapped = g.bbox.x0 - self.last_x1 > em * SPAN_GAP_EM;
            if restyled || gapped {
                self.finish_span();
            }
        }

        match self.span.as_mut() {
            Some(span) => {
                span.text.push(g.ch);
                span.bbox = span.bbox.union(&g.bbox);
            }
            None => {
                self.span = Some(TextSpan {
                    text: g.ch.to_string(),
                    font: g.font.clone(),
                    size: g.size,
                    color: g.color,
                    bbox: g.bbox,
                    origin: g.origin,
                });
            }
        }

        if self.baseline.is_none() {
            self.baseline = Some(g.origin.1);
        }
        self.last_x1 = g.bbox.x1;
    }

    fn current_size(&self) -> f32 {
        self.span
            .as_ref()
            .map(|s| s.size)
            .or_else(|| self.line_spans.last().map(|s| s.size))
            .unwrap_or(0.0)
    }

    fn finish_span(&mut self) {
        if let Some(span) = self.span.take() {
            self.line_spans.push(span);
        }
    }

    fn finish_line(&mut self) {
        self.finish_span();
        self.baseline = None;
        if self.line_spans.is_empty() {
            return;
        }

        let spans = std::mem::take(&mut self.line_spans);
        let bbox = spans
            .iter()
            .fold(Rect::default(), |acc, s| acc.union(&s.bbox));
        let line = TextLine { bbox, spans };

        if let Some(prev) = self.block_lines.last() {
            if line.bbox.y0 - prev.bbox.y1 > prev.bbox.height() {
                self.finish_block();
            }
        }
        self.block_lines.push(line);
    }

    fn finish_block(&mut self) {
        if self.block_lines.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.block_lines);
        let bbox = lines
            .iter()
            .fold(Rect::default(), |acc, l| acc.union(&l.bbox));
        self.blocks.push(TextBlock {
            number: self.blocks.len(),
            kind: "text",
            bbox,
            lines,
        });
    }

    fn finish(mut self) -> Vec<TextBlock> {
        self.finish_line();
        self.finish_block();
        self.blocks
    }
}

/// Group glyphs into blocks of lines of spans.
pub fn assemble_blocks(glyphs: &[Glyph]) -> Vec<TextBlock> {
    let mut assembler = Assembler::default();
    for g in glyphs {
        assembler.push(g);
    }
    assembler.finish()
}
