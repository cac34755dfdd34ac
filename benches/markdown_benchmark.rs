//! Performance benchmarks for the text pipeline
//!
//! Run with: `cargo bench`
//!
//! Glyphs are synthesized so the benchmarks do not need a PDFium library.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pdf_tools_mcp::pdf::{
    assemble_blocks, find_occurrences, render_markdown, AlignedColumnFinder, Glyph, PageText,
    Rect, TableFinder,
};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;

fn glyph_run(out: &mut Vec<Glyph>, text: &str, font: &str, size: f32, x: f32, baseline: f32) {
    let advance = size * 0.5;
    for (i, ch) in text.chars().enumerate() {
        let x0 = x + i as f32 * advance;
        out.push(Glyph {
            ch,
            font: font.to_string(),
            size,
            bbox: Rect::new(x0, baseline - size * 0.8, x0 + advance, baseline + size * 0.2),
            origin: (x0, baseline),
            color: 0,
        });
    }
    out.push(Glyph {
        ch: '\n',
        font: String::new(),
        size: 0.0,
        bbox: Rect::default(),
        origin: (0.0, 0.0),
        color: 0,
    });
}

/// A heading followed by `lines` body lines of prose.
fn prose_page(lines: usize) -> Vec<Glyph> {
    let mut glyphs = Vec::new();
    glyph_run(&mut glyphs, "Annual Summary", "Helvetica-Bold", 24.0, 72.0, 80.0);
    for i in 0..lines {
        let baseline = 120.0 + i as f32 * 14.0;
        glyph_run(
            &mut glyphs,
            "The quick brown fox jumps over the lazy dog again and again.",
            "Helvetica",
            11.0,
            72.0,
            baseline,
        );
    }
    glyphs
}

/// A three-column grid with `rows` rows.
fn table_page(rows: usize) -> Vec<Glyph> {
    let mut glyphs = Vec::new();
    for r in 0..rows {
        let baseline = 100.0 + r as f32 * 14.0;
        glyph_run(&mut glyphs, &format!("item-{r}"), "Helvetica", 10.0, 72.0, baseline);
        glyph_run(&mut glyphs, &format!("{}", r * 7), "Helvetica", 10.0, 250.0, baseline);
        glyph_run(&mut glyphs, "ok", "Helvetica", 10.0, 400.0, baseline);
    }
    glyphs
}

fn page_text(glyphs: &[Glyph]) -> PageText {
    PageText {
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        blocks: assemble_blocks(glyphs),
    }
}

/// Benchmark grouping glyphs into blocks, lines and spans
fn bench_assemble_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_blocks");

    for lines in [10usize, 50] {
        let glyphs = prose_page(lines);
        group.throughput(Throughput::Elements(glyphs.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &glyphs, |b, glyphs| {
            b.iter(|| assemble_blocks(black_box(glyphs)));
        });
    }

    group.finish();
}

/// Benchmark markdown reconstruction with and without table detection
fn bench_render_markdown(c: &mut Criterion) {
    let finder = AlignedColumnFinder::default();
    let mut group = c.benchmark_group("render_markdown");

    let prose = page_text(&prose_page(50));
    group.bench_function("prose_50_lines", |b| {
        b.iter(|| {
            let scan = finder.find_tables(black_box(&prose));
            render_markdown(&prose, &scan)
        });
    });

    let grid = page_text(&table_page(40));
    group.bench_function("table_40_rows", |b| {
        b.iter(|| {
            let scan = finder.find_tables(black_box(&grid));
            render_markdown(&grid, &scan)
        });
    });

    group.finish();
}

/// Benchmark text search over a page of glyphs
fn bench_search(c: &mut Criterion) {
    let glyphs = prose_page(50);
    let mut group = c.benchmark_group("search");

    group.bench_function("case_sensitive", |b| {
        b.iter(|| find_occurrences(black_box(&glyphs), "lazy dog", true));
    });

    group.bench_function("case_insensitive", |b| {
        b.iter(|| find_occurrences(black_box(&glyphs), "LAZY DOG", false));
    });

    group.finish();
}

criterion_group!(benches, bench_assemble_blocks, bench_render_markdown, bench_search);

criterion_main!(benches);
