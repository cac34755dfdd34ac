//! Text search over a page's glyph stream.
//!
//! Matching runs on the characters PDFium reports, so hits may cross span
//! and line boundaries. Engine line feeds match a single space; carriage
//! returns are ignored.

use crate::pdf::model::{Glyph, Rect};

/// One hit, covered by one rectangle per text line it touches.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub rects: Vec<Rect>,
}

fn fold_char(c: char, case_sensitive: bool) -> char {
    let c = if c == '\n' { ' ' } else { c };
    if case_sensitive {
        c
    } else {
        c.to_lowercase().next().unwrap_or(c)
    }
}

/// Find non-overlapping occurrences of `needle`, scanning left to right.
pub fn find_occurrences(glyphs: &[Glyph], needle: &str, case_sensitive: bool) -> Vec<Occurrence> {
    let pattern: Vec<char> = needle
        .chars()
        .map(|c| fold_char(c, case_sensitive))
        .collect();
    if pattern.is_empty() {
        return Vec::new();
    }

    // Searchable characters paired with their glyph index.
    let stream: Vec<(char, usize)> = glyphs
        .iter()
        .enumerate()
        .filter(|(_, g)| g.ch != '\r')
        .map(|(i, g)| (fold_char(g.ch, case_sensitive), i))
        .collect();

    let mut hits = Vec::new();
    let mut i = 0;
    while i + pattern.len() <= stream.len() {
        let window = &stream[i..i + pattern.len()];
        if window.iter().map(|(c, _)| *c).eq(pattern.iter().copied()) {
            let matched: Vec<&Glyph> = window.iter().map(|&(_, gi)| &glyphs[gi]).collect();
            let rects = line_rects(&matched);
            if !rects.is_empty() {
                hits.push(Occurrence { rects });
            }
            i += pattern.len();
        } else {
            i += 1;
        }
    }

    hits
}

/// Union the glyph boxes of a match, starting a new rectangle whenever the
/// baseline moves by more than half the font size.
fn line_rects(glyphs: &[&Glyph]) -> Vec<Rect> {
    let mut rects: Vec<Rect> = Vec::new();
    let mut current: Option<(Rect, f32, f32)> = None;

    for g in glyphs {
        if g.bbox.is_empty() || !g.bbox.is_finite() {
            continue;
        }
        current = match current {
            Some((rect, baseline, size))
                if (g.origin.1 - baseline).abs() <= size.max(g.size).max(1.0) * 0.5 =>
            {
                Some((rect.union(&g.bbox), baseline, size))
            }
            Some((rect, _, _)) => {
                rects.push(rect);
                Some((g.bbox, g.origin.1, g.size))
            }
            None => Some((g.bbox, g.origin.1, g.size)),
        };
    }

    if let Some((rect, _, _)) = current {
        rects.push(rect);
    }
    rects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::layout::tests::glyph_run;

    fn newline() -> Glyph {
        Glyph {
            ch: '\n',
            font: String::new(),
            size: 0.0,
            bbox: Rect::default(),
            origin: (0.0, 0.0),
            color: 0,
        }
    }

    #[test]
    fn test_finds_single_word() {
        let glyphs = glyph_run("hello world", "Helvetica", 10.0, 0.0, 50.0);
        let hits = find_occurrences(&glyphs, "world", true);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rects.len(), 1);
        let r = hits[0].rects[0];
        assert_eq!(r.x0, 30.0);
        assert_eq!(r.x1, 55.0);
    }

    #[test]
    fn test_case_sensitivity() {
        let glyphs = glyph_run("Alpha alpha ALPHA", "Helvetica", 10.0, 0.0, 50.0);
        assert_eq!(find_occurrences(&glyphs, "alpha", true).len(), 1);
        assert_eq!(find_occurrences(&glyphs, "alpha", false).len(), 3);
    }

    #[test]
    fn test_matches_do_not_overlap() {
        let glyphs = glyph_run("aaaa", "Helvetica", 10.0, 0.0, 50.0);
        assert_eq!(find_occurrences(&glyphs, "aa", true).len(), 2);
    }

    #[test]
    fn test_match_across_lines_yields_rect_per_line() {
        let mut glyphs = glyph_run("end of", "Helvetica", 10.0, 0.0, 50.0);
        glyphs.push(newline());
        glyphs.extend(glyph_run("line", "Helvetica", 10.0, 0.0, 64.0));

        let hits = find_occurrences(&glyphs, "of line", true);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rects.len(), 2);
        assert!(hits[0].rects[0].y1 <= hits[0].rects[1].y1);
    }

    #[test]
    fn test_empty_needle_finds_nothing() {
        let glyphs = glyph_run("abc", "Helvetica", 10.0, 0.0, 50.0);
        assert!(find_occurrences(&glyphs, "", true).is_empty());
    }
}
