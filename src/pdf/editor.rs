//! Write operations. Each takes the current document bytes and returns the
//! modified document bytes together with a summary of what changed; the
//! caller decides where to persist them.
//!
//! Coordinates are top-left page space and are converted to PDF space here.

use crate::error::{Error, Result};
use crate::pdf::engine::{
    create_pdfium, ensure_pdf_header, get_page, load_document, page_count, rgb_to_color,
    save_document, select_pages, to_pdf_rect, to_top_left,
};
use crate::pdf::layout::{assemble_blocks, collect_glyphs};
use crate::pdf::model::{Rect, TextSpan};
use crate::pdf::search::find_occurrences;
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::Path;

/// Font size used by `add_text` when none is given.
pub const DEFAULT_TEXT_SIZE: f32 = 11.0;

/// Image size used by `insert_image` when none is given.
pub const DEFAULT_IMAGE_SIZE: (f32, f32) = (100.0, 100.0);

const HIGHLIGHT_COLOR: u32 = 0xFFFF00;

/// What an edit did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditSummary {
    /// Pages the edit touched.
    pub pages: Vec<u32>,
    /// Number of items inserted, replaced, highlighted or redacted.
    pub count: u32,
}

impl EditSummary {
    fn record(&mut self, page: u32, n: u32) {
        if n > 0 && !self.pages.contains(&page) {
            self.pages.push(page);
        }
        self.count += n;
    }
}

/// Standard PDF fonts available without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base14Font {
    Helvetica,
    TimesRoman,
    Courier,
    Symbol,
}

impl Base14Font {
    fn token(self, document: &mut PdfDocument) -> PdfFontToken {
        let fonts = document.fonts_mut();
        match self {
            Base14Font::Helvetica => fonts.helvetica(),
            Base14Font::TimesRoman => fonts.times_roman(),
            Base14Font::Courier => fonts.courier(),
            Base14Font::Symbol => fonts.symbol(),
        }
    }
}

/// Ordered substring table; the first key found in the font name wins.
const FONT_FALLBACKS: &[(&str, Base14Font)] = &[
    ("times new roman", Base14Font::TimesRoman),
    ("times", Base14Font::TimesRoman),
    ("arial", Base14Font::Helvetica),
    ("arial bold", Base14Font::Helvetica),
    ("helvetica", Base14Font::Helvetica),
    ("courier", Base14Font::Courier),
    ("courier new", Base14Font::Courier),
    ("symbol", Base14Font::Symbol),
];

/// Pick a standard font that stands in for `font_name`. Unknown fonts fall
/// back to Helvetica.
pub fn fallback_font(font_name: &str) -> Base14Font {
    let lower = font_name.to_lowercase();
    FONT_FALLBACKS
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, font)| *font)
        .unwrap_or(Base14Font::Helvetica)
}

/// Parse `#RRGGBB` (the `#` is optional) into `0xRRGGBB`.
pub fn parse_hex_color(value: &str) -> Result<u32> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidColor {
            value: value.to_string(),
        });
    }
    u32::from_str_radix(hex, 16).map_err(|_| Error::InvalidColor {
        value: value.to_string(),
    })
}

fn require_text(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidParameter {
            reason: format!("{} must not be empty", name),
        });
    }
    Ok(())
}

fn require_area(rect: &Rect) -> Result<()> {
    if !rect.is_finite() || rect.is_empty() {
        return Err(Error::InvalidParameter {
            reason: "bbox must have a positive width and height".to_string(),
        });
    }
    Ok(())
}

/// Load, select pages, run `edit` on each, and serialize the result.
fn edit_pages(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
    mut edit: impl FnMut(&mut PdfDocument, u32, &mut PdfPage) -> Result<u32>,
) -> Result<(Vec<u8>, EditSummary)> {
    ensure_pdf_header(data)?;
    let pdfium = create_pdfium()?;
    let mut document = load_document(&pdfium, data, password)?;
    let selected = select_pages(pages, page_count(&document))?;

    let mut summary = EditSummary::default();
    for index in selected {
        let mut page = get_page(&document, index)?;
        let n = edit(&mut document, index, &mut page)?;
        if n > 0 {
            page.regenerate_content().map_err(pdfium_error)?;
        }
        summary.record(index, n);
    }

    let bytes = save_document(&document)?;
    Ok((bytes, summary))
}

fn pdfium_error(e: PdfiumError) -> Error {
    Error::Pdfium {
        reason: format!("{}", e),
    }
}

/// Insert a single line of text with its baseline at `position`.
pub fn add_text(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
    text: &str,
    position: (f32, f32),
    font_size: Option<f32>,
) -> Result<(Vec<u8>, EditSummary)> {
    require_text("text", text)?;
    let size = font_size.unwrap_or(DEFAULT_TEXT_SIZE);
    if !(size.is_finite() && size > 0.0) {
        return Err(Error::InvalidParameter {
            reason: "font_size must be positive".to_string(),
        });
    }

    edit_pages(data, password, pages, |document, _index, page| {
        let font = Base14Font::Helvetica.token(document);
        let height = page.height().value;
        place_text(page, text, position.0, height - position.1, font, size, 0x000000)?;
        Ok(1)
    })
}

fn place_text(
    page: &mut PdfPage,
    text: &str,
    x: f32,
    y: f32,
    font: PdfFontToken,
    size: f32,
    color: u32,
) -> Result<()> {
    let mut object = page
        .objects_mut()
        .create_text_object(
            PdfPoints::new(x),
            PdfPoints::new(y),
            text,
            font,
            PdfPoints::new(size),
        )
        .map_err(pdfium_error)?;
    object
        .set_fill_color(rgb_to_color(color))
        .map_err(pdfium_error)?;
    Ok(())
}

/// Where a replacement goes and how it should look.
struct Replacement {
    rect: Rect,
    baseline: f32,
    font: Base14Font,
    size: f32,
    color: u32,
}

fn matching_span<'a>(spans: &'a [TextSpan], needle: &str, rect: &Rect) -> Option<&'a TextSpan> {
    spans
        .iter()
        .find(|s| s.text.contains(needle) && s.bbox.intersects(rect))
}

/// Redact every case-sensitive occurrence of `old_text` and typeset
/// `new_text` in its place. Occurrences whose line has no span containing
/// the whole of `old_text` are left untouched.
pub fn replace_text(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
    old_text: &str,
    new_text: &str,
) -> Result<(Vec<u8>, EditSummary)> {
    require_text("old_text", old_text)?;

    edit_pages(data, password, pages, |document, index, page| {
        let glyphs = collect_glyphs(page)?;
        let spans: Vec<TextSpan> = assemble_blocks(&glyphs)
            .into_iter()
            .flat_map(|b| b.lines)
            .flat_map(|l| l.spans)
            .collect();

        let mut replacements = Vec::new();
        for occurrence in find_occurrences(&glyphs, old_text, true) {
            for rect in occurrence.rects {
                match matching_span(&spans, old_text, &rect) {
                    Some(span) => replacements.push(Replacement {
                        rect,
                        baseline: span.origin.1,
                        font: fallback_font(&span.font),
                        size: span.size,
                        color: span.color,
                    }),
                    None => {
                        tracing::debug!(page = index, "occurrence has no matching span, skipped")
                    }
                }
            }
        }

        for r in &replacements {
            redact_area(document, page, &r.rect)?;
        }

        if !new_text.is_empty() {
            let height = page.height().value;
            for r in &replacements {
                let font = r.font.token(document);
                place_text(page, new_text, r.rect.x0, height - r.baseline, font, r.size, r.color)?;
            }
        }

        Ok(replacements.len() as u32)
    })
}

/// Add a highlight annotation over every occurrence of `text`.
pub fn highlight_text(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
    text: &str,
    case_sensitive: bool,
) -> Result<(Vec<u8>, EditSummary)> {
    require_text("text", text)?;

    edit_pages(data, password, pages, |_document, _index, page| {
        let glyphs = collect_glyphs(page)?;
        let height = page.height().value;
        let mut count = 0;

        for occurrence in find_occurrences(&glyphs, text, case_sensitive) {
            for rect in &occurrence.rects {
                let pdf_rect = to_pdf_rect(rect, height);
                let mut annotation = page
                    .annotations_mut()
                    .create_highlight_annotation()
                    .map_err(pdfium_error)?;
                annotation.set_bounds(pdf_rect).map_err(pdfium_error)?;
                annotation
                    .attachment_points_mut()
                    .create_attachment_point_at_end(PdfQuadPoints::from_rect(&pdf_rect))
                    .map_err(pdfium_error)?;
                annotation
                    .set_stroke_color(rgb_to_color(HIGHLIGHT_COLOR))
                    .map_err(pdfium_error)?;
                count += 1;
            }
        }
        Ok(count)
    })
}

/// Place an image with its top-left corner at `position`.
pub fn insert_image(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
    image_path: &Path,
    position: (f32, f32),
    size: Option<(f32, f32)>,
) -> Result<(Vec<u8>, EditSummary)> {
    let (width, height) = size.unwrap_or(DEFAULT_IMAGE_SIZE);
    if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
        return Err(Error::InvalidParameter {
            reason: "size must be positive".to_string(),
        });
    }
    if !image_path.exists() {
        return Err(Error::InvalidParameter {
            reason: "image_path does not exist".to_string(),
        });
    }
    let image = image::open(image_path)?;

    edit_pages(data, password, pages, |_document, _index, page| {
        let page_height = page.height().value;
        page.objects_mut()
            .create_image_object(
                PdfPoints::new(position.0),
                PdfPoints::new(page_height - position.1 - height),
                &image,
                Some(PdfPoints::new(width)),
                Some(PdfPoints::new(height)),
            )
            .map_err(pdfium_error)?;
        Ok(1)
    })
}

/// Redact everything inside `bbox`, leaving a white area.
pub fn delete_text_by_bbox(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
    bbox: Rect,
) -> Result<(Vec<u8>, EditSummary)> {
    require_area(&bbox)?;

    edit_pages(data, password, pages, |document, _index, page| {
        redact_area(document, page, &bbox)?;
        Ok(1)
    })
}

/// Draw an unfilled rectangle outline.
pub fn annotate_rect(
    data: &[u8],
    password: Option<&str>,
    pages: Option<&[u32]>,
    bbox: Rect,
    color: &str,
) -> Result<(Vec<u8>, EditSummary)> {
    require_area(&bbox)?;
    let rgb = parse_hex_color(color)?;

    edit_pages(data, password, pages, |_document, _index, page| {
        let rect = to_pdf_rect(&bbox, page.height().value);
        page.objects_mut()
            .create_path_object_rect(
                rect,
                Some(rgb_to_color(rgb)),
                Some(PdfPoints::new(1.0)),
                None,
            )
            .map_err(pdfium_error)?;
        Ok(1)
    })
}

/// Glyphs of a partly covered text object that stay visible, typeset again
/// from the baseline origin of their first glyph.
#[derive(Debug, Clone, PartialEq)]
struct KeptRun {
    text: String,
    /// PDF space.
    origin: (f32, f32),
}

/// Typesetting state of a text object that gets split around a redaction.
struct Rebuild {
    font: PdfFontToken,
    fallback: Base14Font,
    unscaled_size: f32,
    scaled_size: f32,
    color: PdfColor,
    matrix: Option<PdfMatrix>,
    runs: Vec<KeptRun>,
}

/// What to do with one page object under a redaction area.
enum Redaction {
    Remove(usize),
    Rebuild(usize, Rebuild),
}

/// Group `(char, covered, origin)` triples into the runs that survive.
/// Returns `None` when no glyph is covered. Runs never start with
/// whitespace, and blank runs are dropped.
fn split_kept_runs<I>(glyphs: I) -> Option<Vec<KeptRun>>
where
    I: IntoIterator<Item = (char, bool, (f32, f32))>,
{
    let mut runs = Vec::new();
    let mut current: Option<KeptRun> = None;
    let mut touched = false;

    for (c, covered, origin) in glyphs {
        if covered {
            touched = true;
            runs.extend(current.take());
            continue;
        }
        match current.as_mut() {
            Some(run) => run.text.push(c),
            None if c.is_whitespace() => {}
            None => {
                current = Some(KeptRun {
                    text: c.to_string(),
                    origin,
                })
            }
        }
    }
    runs.extend(current);

    if !touched {
        return None;
    }
    for run in runs.iter_mut() {
        let trimmed = run.text.trim_end().len();
        run.text.truncate(trimmed);
    }
    runs.retain(|r| !r.text.is_empty());
    Some(runs)
}

/// Runs of `object` left standing once glyphs centred inside `area` are
/// dropped. `Err(())` when the glyphs cannot be mapped onto the object's
/// text.
fn kept_runs(
    object: &PdfPageTextObject,
    page_text: &PdfPageText,
    area: &Rect,
    page_height: f32,
) -> std::result::Result<Option<Vec<KeptRun>>, ()> {
    let chars = object.chars(page_text).map_err(|_| ())?;
    if chars.len() != object.text().chars().count() {
        return Err(());
    }

    let mut glyphs = Vec::with_capacity(chars.len());
    for ch in chars.iter() {
        let c = ch.unicode_char().ok_or(())?;
        let covered = ch
            .loose_bounds()
            .map(|b| {
                let (cx, cy) = to_top_left(&b, page_height).center();
                area.contains_point(cx, cy)
            })
            .unwrap_or(false);
        let (x, y) = ch.origin().map_err(|_| ())?;
        glyphs.push((c, covered, (x.value, y.value)));
    }
    Ok(split_kept_runs(glyphs))
}

fn plan_redaction(page: &PdfPage, area: &Rect) -> Result<Vec<Redaction>> {
    let page_height = page.height().value;
    let pdf_area = to_pdf_rect(area, page_height);
    let page_text = page.text().map_err(pdfium_error)?;
    let mut plan = Vec::new();

    for (index, object) in page.objects().iter().enumerate() {
        if object.is_inside_rect(&pdf_area) {
            if matches!(
                object.object_type(),
                PdfPageObjectType::Text | PdfPageObjectType::Image | PdfPageObjectType::Path
            ) {
                plan.push(Redaction::Remove(index));
            }
            continue;
        }

        if !object.does_overlap_rect(&pdf_area) {
            continue;
        }
        let Some(text_object) = object.as_text_object() else {
            continue;
        };
        match kept_runs(text_object, &page_text, area, page_height) {
            Ok(None) => {}
            Ok(Some(runs)) if runs.is_empty() => plan.push(Redaction::Remove(index)),
            Ok(Some(runs)) => {
                let font = text_object.font();
                plan.push(Redaction::Rebuild(
                    index,
                    Rebuild {
                        font: font.token(),
                        fallback: fallback_font(&font.name()),
                        unscaled_size: text_object.unscaled_font_size().value,
                        scaled_size: text_object.scaled_font_size().value,
                        color: text_object.fill_color().unwrap_or(PdfColor::BLACK),
                        matrix: text_object.matrix().ok(),
                        runs,
                    },
                ));
            }
            Err(()) => plan.push(Redaction::Remove(index)),
        }
    }
    Ok(plan)
}

/// Typeset one kept run with the removed object's font, size, colour and
/// transform so each glyph lands where it was.
fn typeset_run(
    document: &mut PdfDocument,
    page: &mut PdfPage,
    rebuild: &Rebuild,
    run: &KeptRun,
) -> Result<()> {
    let (x, y) = run.origin;
    let (at, size) = match rebuild.matrix {
        Some(_) => ((0.0, 0.0), rebuild.unscaled_size),
        None => ((x, y), rebuild.scaled_size),
    };

    let created = page.objects_mut().create_text_object(
        PdfPoints::new(at.0),
        PdfPoints::new(at.1),
        &run.text,
        rebuild.font,
        PdfPoints::new(size),
    );
    let mut object = match created {
        Ok(object) => object,
        Err(e) => {
            tracing::debug!(error = %e, "source font not reusable, using {:?}", rebuild.fallback);
            let font = rebuild.fallback.token(document);
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(at.0),
                    PdfPoints::new(at.1),
                    &run.text,
                    font,
                    PdfPoints::new(size),
                )
                .map_err(pdfium_error)?
        }
    };

    object
        .set_fill_color(rebuild.color)
        .map_err(pdfium_error)?;
    if let (Some(m), Some(text_object)) =
        (rebuild.matrix.as_ref(), object.as_text_object_mut())
    {
        text_object
            .set_matrix(PdfMatrix::new(m.a(), m.b(), m.c(), m.d(), x, y))
            .map_err(pdfium_error)?;
    }
    Ok(())
}

/// Remove content under `area` (top-left page space) and cover it with
/// white. Text objects only partly covered are split: their uncovered
/// glyphs are typeset again at their original positions.
pub(crate) fn redact_area(
    document: &mut PdfDocument,
    page: &mut PdfPage,
    area: &Rect,
) -> Result<()> {
    let plan = plan_redaction(page, area)?;

    let mut removals = Vec::new();
    let mut rebuilds = Vec::new();
    for step in plan {
        match step {
            Redaction::Remove(index) => removals.push(index),
            Redaction::Rebuild(index, rebuild) => {
                removals.push(index);
                rebuilds.push(rebuild);
            }
        }
    }

    removals.sort_unstable_by(|a, b| b.cmp(a));
    for index in removals {
        page.objects_mut()
            .remove_object_at_index(index as PdfPageObjectIndex)
            .map_err(pdfium_error)?;
    }

    for rebuild in &rebuilds {
        for run in &rebuild.runs {
            typeset_run(document, page, rebuild, run)?;
        }
    }

    let pdf_area = to_pdf_rect(area, page.height().value);
    page.objects_mut()
        .create_path_object_rect(pdf_area, None, None, Some(PdfColor::WHITE))
        .map_err(pdfium_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("TimesNewRomanPSMT", Base14Font::TimesRoman)]
    #[case("Times New Roman Bold", Base14Font::TimesRoman)]
    #[case("Times-Italic", Base14Font::TimesRoman)]
    #[case("ArialMT", Base14Font::Helvetica)]
    #[case("Helvetica-Bold", Base14Font::Helvetica)]
    #[case("CourierNewPSMT", Base14Font::Courier)]
    #[case("Symbol", Base14Font::Symbol)]
    #[case("Garamond", Base14Font::Helvetica)]
    fn test_fallback_font(#[case] name: &str, #[case] expected: Base14Font) {
        assert_eq!(fallback_font(name), expected);
    }

    fn kept(text: &str, x: f32) -> KeptRun {
        KeptRun {
            text: text.to_string(),
            origin: (x, 700.0),
        }
    }

    /// Glyphs at 10pt pitch; characters inside `covered` are redacted.
    fn glyph_line(text: &str, covered: std::ops::Range<usize>) -> Vec<(char, bool, (f32, f32))> {
        text.chars()
            .enumerate()
            .map(|(i, c)| (c, covered.contains(&i), (72.0 + i as f32 * 10.0, 700.0)))
            .collect()
    }

    #[test]
    fn test_kept_runs_keep_their_original_origins() {
        // "Hello world from" with "world" covered
        let runs = split_kept_runs(glyph_line("Hello world from", 6..11)).unwrap();
        assert_eq!(runs, vec![kept("Hello", 72.0), kept("from", 192.0)]);
    }

    #[test]
    fn test_untouched_object_needs_no_rebuild() {
        assert_eq!(split_kept_runs(glyph_line("Hello", 0..0)), None);
    }

    #[test]
    fn test_fully_covered_object_leaves_no_runs() {
        let runs = split_kept_runs(glyph_line("gone", 0..4)).unwrap();
        assert!(runs.is_empty());
    }

    #[test]
    fn test_cover_in_the_middle_of_a_word() {
        let runs = split_kept_runs(glyph_line("abcdef", 2..4)).unwrap();
        assert_eq!(runs, vec![kept("ab", 72.0), kept("ef", 112.0)]);
    }

    #[rstest]
    #[case("#FF0000", 0xFF0000)]
    #[case("00ff7f", 0x00FF7F)]
    #[case(" #0a0B0c ", 0x0A0B0C)]
    fn test_parse_hex_color(#[case] input: &str, #[case] expected: u32) {
        assert_eq!(parse_hex_color(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("#FFF")]
    #[case("#GG0000")]
    #[case("#FF00001")]
    #[case("red")]
    fn test_parse_hex_color_rejects(#[case] input: &str) {
        assert!(matches!(
            parse_hex_color(input),
            Err(Error::InvalidColor { .. })
        ));
    }

    #[test]
    fn test_empty_search_text_rejected() {
        let result = replace_text(b"%PDF-1.7", None, None, "", "x");
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
        let result = highlight_text(b"%PDF-1.7", None, None, "", false);
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_degenerate_bbox_rejected() {
        let flat = Rect::new(10.0, 10.0, 50.0, 10.0);
        let result = delete_text_by_bbox(b"%PDF-1.7", None, None, flat);
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_bad_color_rejected_before_loading() {
        let result = annotate_rect(
            b"%PDF-1.7",
            None,
            None,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            "blue",
        );
        assert!(matches!(result, Err(Error::InvalidColor { .. })));
    }

    #[test]
    fn test_summary_records_pages_once() {
        let mut summary = EditSummary::default();
        summary.record(2, 3);
        summary.record(2, 1);
        summary.record(4, 0);
        assert_eq!(summary.pages, vec![2]);
        assert_eq!(summary.count, 4);
    }
}
