//! Page text model shared by the span extractor, the markdown
//! reconstructor and the JSON/layout tools.
//!
//! All coordinates use the top-left page origin with y growing downward,
//! in PDF points.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle `(x0, y0)`-`(x1, y1)` with `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "[f32; 4]", from = "[f32; 4]")]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Smallest rectangle covering both. Empty rectangles are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// True when the interiors overlap; touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }
}

impl From<Rect> for [f32; 4] {
    fn from(r: Rect) -> Self {
        [r.x0, r.y0, r.x1, r.y1]
    }
}

impl From<[f32; 4]> for Rect {
    fn from(v: [f32; 4]) -> Self {
        Rect::new(v[0], v[1], v[2], v[3])
    }
}

/// A single positioned character as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub font: String,
    pub size: f32,
    pub bbox: Rect,
    /// Baseline origin `(x, y)`.
    pub origin: (f32, f32),
    /// Fill colour as `0xRRGGBB`.
    pub color: u32,
}

/// A contiguous run of text sharing one font and size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSpan {
    pub text: String,
    pub font: String,
    pub size: f32,
    pub color: u32,
    pub bbox: Rect,
    pub origin: (f32, f32),
}

impl TextSpan {
    pub fn is_bold(&self) -> bool {
        self.font.contains("Bold")
    }

    pub fn is_italic(&self) -> bool {
        self.font.contains("Italic") || self.font.contains("Oblique")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLine {
    pub bbox: Rect,
    pub spans: Vec<TextSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub number: usize,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub bbox: Rect,
    pub lines: Vec<TextLine>,
}

/// Structured text for one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PageText {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<TextBlock>,
}

impl PageText {
    pub fn spans(&self) -> impl Iterator<Item = &TextSpan> {
        self.blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .flat_map(|l| l.spans.iter())
    }

    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_corners() {
        let r = Rect::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(r, Rect { x0: 0.0, y0: 5.0, x1: 10.0, y1: 20.0 });
    }

    #[test]
    fn test_rect_union_skips_empty() {
        let a = Rect::new(0.0, 0.0, 0.0, 0.0);
        let b = Rect::new(1.0, 1.0, 2.0, 2.0);
        assert_eq!(a.union(&b), b);
        assert_eq!(b.union(&a), b);
    }

    #[test]
    fn test_rect_intersects_ignores_touching_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn test_rect_serializes_as_array() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(serde_json::to_string(&r).unwrap(), "[1.0,2.0,3.0,4.0]");
        let back: Rect = serde_json::from_str("[3.0,4.0,1.0,2.0]").unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_span_style_flags() {
        let span = TextSpan {
            text: "x".into(),
            font: "Helvetica-BoldOblique".into(),
            size: 12.0,
            color: 0,
            bbox: Rect::default(),
            origin: (0.0, 0.0),
        };
        assert!(span.is_bold());
        assert!(span.is_italic());
    }
}
