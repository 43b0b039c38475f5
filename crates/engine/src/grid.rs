use serde::Serialize;

/// Maximum dimensions for a loaded sheet grid. Anything past these bounds
/// is scan noise, not shipment data — real documents put their totals in
/// the first screenful.
pub const MAX_SCAN_ROWS: usize = 200;
pub const MAX_SCAN_COLS: usize = 30;

/// Role extraction never looks past this many rows.
pub const MAX_ROLE_ROWS: usize = 150;

/// Header clusters are only searched in the top of the sheet.
pub const MAX_HEADER_ROWS: usize = 50;

/// A computed cell value. The engine consumes already-evaluated values;
/// formulas are carried separately as raw text for density scoring only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

static EMPTY: CellValue = CellValue::Empty;

/// One worksheet as a bounded 2-D grid with two row/column-aligned views:
/// computed values and raw formula text. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    name: String,
    rows: Vec<Vec<CellValue>>,
    formulas: Vec<Vec<String>>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), rows: Vec::new(), formulas: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Set a cell value. Writes past the scan bounds are dropped — the
    /// caps are the contract, not a suggestion.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if row >= MAX_SCAN_ROWS || col >= MAX_SCAN_COLS {
            return;
        }
        grow(&mut self.rows, row, col, CellValue::Empty);
        self.rows[row][col] = value;
    }

    pub fn set_text(&mut self, row: usize, col: usize, text: impl Into<String>) {
        self.set(row, col, CellValue::Text(text.into()));
    }

    pub fn set_number(&mut self, row: usize, col: usize, n: f64) {
        self.set(row, col, CellValue::Number(n));
    }

    /// Set the raw formula text for a cell (leading '=' included by the
    /// loader). The formula view stays aligned with the value view.
    pub fn set_formula(&mut self, row: usize, col: usize, formula: impl Into<String>) {
        if row >= MAX_SCAN_ROWS || col >= MAX_SCAN_COLS {
            return;
        }
        grow(&mut self.formulas, row, col, String::new());
        self.formulas[row][col] = formula.into();
    }

    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    pub fn formula(&self, row: usize, col: usize) -> Option<&str> {
        self.formulas
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }

    /// String rendering of a non-empty cell, for header matching and
    /// label searches. Whole numbers render without a trailing ".0".
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        match self.value(row, col) {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(fmt_number(*n)),
        }
    }

    /// Count of non-empty cells in a row (used by the header diagnostic).
    pub fn row_cell_count(&self, row: usize) -> usize {
        self.rows
            .get(row)
            .map(|r| r.iter().filter(|c| !c.is_empty()).count())
            .unwrap_or(0)
    }
}

fn grow<T: Clone>(rows: &mut Vec<Vec<T>>, row: usize, col: usize, fill: T) {
    if rows.len() <= row {
        rows.resize(row + 1, Vec::new());
    }
    let r = &mut rows[row];
    if r.len() <= col {
        r.resize(col + 1, fill);
    }
}

/// Integers without decimals, everything else via the shortest f64 form.
pub fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_stay_aligned() {
        let mut grid = SheetGrid::new("Invoice");
        grid.set_number(9, 1, 100.0);
        grid.set_formula(9, 1, "=SUM(B2:B8)");
        assert_eq!(grid.value(9, 1).as_number(), Some(100.0));
        assert_eq!(grid.formula(9, 1), Some("=SUM(B2:B8)"));
        assert_eq!(grid.formula(9, 2), None);
    }

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let grid = SheetGrid::new("s");
        assert!(grid.value(500, 500).is_empty());
        assert_eq!(grid.text(500, 500), None);
    }

    #[test]
    fn writes_past_caps_are_dropped() {
        let mut grid = SheetGrid::new("s");
        grid.set_number(MAX_SCAN_ROWS + 5, 0, 1.0);
        grid.set_number(0, MAX_SCAN_COLS + 5, 1.0);
        assert_eq!(grid.n_rows(), 0);
    }

    #[test]
    fn number_rendering() {
        let mut grid = SheetGrid::new("s");
        grid.set_number(0, 0, 5005.0);
        grid.set_number(0, 1, 12.5);
        assert_eq!(grid.text(0, 0).as_deref(), Some("5005"));
        assert_eq!(grid.text(0, 1).as_deref(), Some("12.5"));
    }
}
