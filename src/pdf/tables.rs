//! Table detection over extracted page text.
//!
//! The finder is pluggable; the markdown reconstructor only sees a
//! [`TableScan`] and never fails because of it.

use crate::pdf::model::{PageText, Rect, TextLine};

/// A detected table: its bounding box and rows of cell text.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub bbox: Rect,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(bbox: Rect, rows: Vec<Vec<String>>) -> Self {
        Self { bbox, rows }
    }

    /// Cell text, row by row.
    pub fn extract(&self) -> Vec<Vec<String>> {
        self.rows.clone()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }
}

/// Outcome of looking for tables on one page.
#[derive(Debug, Clone, PartialEq)]
pub enum TableScan {
    Found(Vec<Table>),
    NoTables,
    Failed(String),
}

impl TableScan {
    pub fn tables(&self) -> &[Table] {
        match self {
            TableScan::Found(tables) => tables,
            TableScan::NoTables | TableScan::Failed(_) => &[],
        }
    }
}

pub trait TableFinder: Send + Sync {
    fn find_tables(&self, page: &PageText) -> TableScan;
}

/// Finder that never reports tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTableFinder;

impl TableFinder for NoTableFinder {
    fn find_tables(&self, _page: &PageText) -> TableScan {
        TableScan::NoTables
    }
}

/// Detects tables as runs of consecutive lines that split into the same
/// number of cells with column edges lining up.
#[derive(Debug, Clone)]
pub struct AlignedColumnFinder {
    pub min_rows: usize,
    pub min_columns: usize,
    /// Horizontal gap, in ems, that separates two cells.
    pub cell_gap_em: f32,
    /// Maximum edge offset, in points, for two cells to share a column.
    pub align_tolerance: f32,
    /// Maximum distance between row tops, in ems.
    pub max_row_gap_em: f32,
}

impl Default for AlignedColumnFinder {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            cell_gap_em: 1.0,
            align_tolerance: 4.0,
            max_row_gap_em: 2.5,
        }
    }
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    bbox: Rect,
}

#[derive(Debug)]
struct Row {
    cells: Vec<Cell>,
    bbox: Rect,
    size: f32,
}

impl AlignedColumnFinder {
    fn split_cells(&self, line: &TextLine) -> Vec<Cell> {
        let mut cells: Vec<Cell> = Vec::new();
        for span in &line.spans {
            let text = span.text.trim();
            if text.is_empty() {
                continue;
            }
            let gap = self.cell_gap_em * span.size.max(1.0);
            match cells.last_mut() {
                Some(cell) if span.bbox.x0 - cell.bbox.x1 <= gap => {
                    cell.text.push(' ');
                    cell.text.push_str(text);
                    cell.bbox = cell.bbox.union(&span.bbox);
                }
                _ => cells.push(Cell {
                    text: text.to_string(),
                    bbox: span.bbox,
                }),
            }
        }
        cells
    }

    fn aligned(&self, a: &Rect, b: &Rect) -> bool {
        let tol = self.align_tolerance;
        (a.x0 - b.x0).abs() <= tol
            || (a.x1 - b.x1).abs() <= tol
            || (a.center().0 - b.center().0).abs() <= tol
    }

    fn continues(&self, prev: &Row, next: &Row) -> bool {
        if prev.cells.len() != next.cells.len() {
            return false;
        }
        let em = prev.size.max(next.size).max(1.0);
        if (next.bbox.y0 - prev.bbox.y0).abs() > self.max_row_gap_em * em {
            return false;
        }
        prev.cells
            .iter()
            .zip(&next.cells)
            .all(|(a, b)| self.aligned(&a.bbox, &b.bbox))
    }

    fn flush(&self, run: &mut Vec<Row>, tables: &mut Vec<Table>) {
        if run.len() >= self.min_rows {
            let bbox = run
                .iter()
                .fold(Rect::default(), |acc, r| acc.union(&r.bbox));
            let rows = run
                .iter()
                .map(|r| r.cells.iter().map(|c| c.text.clone()).collect())
                .collect();
            tables.push(Table::new(bbox, rows));
        }
        run.clear();
    }
}

impl TableFinder for AlignedColumnFinder {
    fn find_tables(&self, page: &PageText) -> TableScan {
        if page.spans().any(|s| !s.bbox.is_finite() || !s.size.is_finite()) {
            return TableScan::Failed("non-finite span geometry".to_string());
        }

        let mut tables = Vec::new();
        let mut run: Vec<Row> = Vec::new();

        for line in page.lines() {
            let cells = self.split_cells(line);
            if cells.len() < self.min_columns {
                self.flush(&mut run, &mut tables);
                continue;
            }

            let size = line
                .spans
                .iter()
                .map(|s| s.size)
                .fold(0.0_f32, f32::max);
            let row = Row {
                cells,
                bbox: line.bbox,
                size,
            };

            if let Some(prev) = run.last() {
                if !self.continues(prev, &row) {
                    self.flush(&mut run, &mut tables);
                }
            }
            run.push(row);
        }
        self.flush(&mut run, &mut tables);

        if tables.is_empty() {
            TableScan::NoTables
        } else {
            TableScan::Found(tables)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pdf::layout::assemble_blocks;
    use crate::pdf::layout::tests::glyph_run;
    use crate::pdf::model::Glyph;

    /// Build a page whose rows place each cell at the given x offsets.
    pub(crate) fn grid_page(rows: &[&[&str]], columns: &[f32], top: f32, pitch: f32) -> PageText {
        let mut glyphs: Vec<Glyph> = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            let baseline = top + r as f32 * pitch;
            for (cell, x) in row.iter().zip(columns) {
                glyphs.extend(glyph_run(cell, "Helvetica", 10.0, *x, baseline));
            }
        }
        PageText {
            width: 612.0,
            height: 792.0,
            blocks: assemble_blocks(&glyphs),
        }
    }

    #[test]
    fn test_detects_aligned_grid() {
        let page = grid_page(
            &[&["Name", "Age", "City"], &["Ann", "31", "Oslo"]],
            &[72.0, 200.0, 300.0],
            100.0,
            14.0,
        );
        let scan = AlignedColumnFinder::default().find_tables(&page);
        let tables = scan.tables();
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].extract(),
            vec![
                vec!["Name".to_string(), "Age".into(), "City".into()],
                vec!["Ann".to_string(), "31".into(), "Oslo".into()],
            ]
        );
        assert_eq!(tables[0].column_count(), 3);
    }

    #[test]
    fn test_prose_is_not_a_table() {
        let page = grid_page(
            &[&["A single line of prose"], &["and another one"]],
            &[72.0],
            100.0,
            14.0,
        );
        assert_eq!(
            AlignedColumnFinder::default().find_tables(&page),
            TableScan::NoTables
        );
    }

    #[test]
    fn test_single_row_is_not_a_table() {
        let page = grid_page(&[&["Left", "Right"]], &[72.0, 300.0], 100.0, 14.0);
        assert_eq!(
            AlignedColumnFinder::default().find_tables(&page),
            TableScan::NoTables
        );
    }

    #[test]
    fn test_misaligned_columns_break_the_run() {
        let mut page = grid_page(
            &[&["a", "b"], &["c", "d"]],
            &[72.0, 200.0],
            100.0,
            14.0,
        );
        // Shift the second row's right cell far away from the first.
        let row = &mut page.blocks[0].lines[1];
        for span in row.spans.iter_mut().skip(1) {
            span.bbox.x0 += 80.0;
            span.bbox.x1 += 80.0;
        }
        assert_eq!(
            AlignedColumnFinder::default().find_tables(&page),
            TableScan::NoTables
        );
    }

    #[test]
    fn test_row_jumping_back_up_breaks_the_run() {
        let mut page = grid_page(
            &[&["a", "b"], &["c", "d"]],
            &[72.0, 200.0],
            300.0,
            14.0,
        );
        // Second row reported far above the first, e.g. a later column.
        let row = &mut page.blocks[0].lines[1];
        row.bbox.y0 -= 200.0;
        row.bbox.y1 -= 200.0;
        for span in row.spans.iter_mut() {
            span.bbox.y0 -= 200.0;
            span.bbox.y1 -= 200.0;
        }
        assert_eq!(
            AlignedColumnFinder::default().find_tables(&page),
            TableScan::NoTables
        );
    }

    #[test]
    fn test_non_finite_geometry_fails() {
        let mut page = grid_page(&[&["a", "b"], &["c", "d"]], &[72.0, 200.0], 100.0, 14.0);
        page.blocks[0].lines[0].spans[0].bbox.x1 = f32::NAN;
        assert!(matches!(
            AlignedColumnFinder::default().find_tables(&page),
            TableScan::Failed(_)
        ));
    }

    #[test]
    fn test_no_table_finder() {
        let page = grid_page(&[&["a", "b"], &["c", "d"]], &[72.0, 200.0], 100.0, 14.0);
        assert_eq!(NoTableFinder.find_tables(&page), TableScan::NoTables);
    }
}
