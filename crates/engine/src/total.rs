use crate::grid::{SheetGrid, MAX_SCAN_COLS};

/// Formula prefix treated as a sum aggregate.
const SUM_MARKER: &str = "=SUM";

/// Find the best "total" row: any row with a cell containing "total"
/// (case-insensitive), scored by how much aggregation its formula view
/// shows. Rows containing a blacklisted term are skipped outright — in
/// this domain product descriptions say things like "total grain buffalo
/// leather", which is a line item, not an aggregate.
///
/// Score = 1 for the label, +2 per sum formula, +1 per simple additive
/// formula ('=' and '+' both present). Strictly-greater wins, so the
/// first row at a given score keeps it.
pub fn locate(grid: &SheetGrid, blacklist: &[String]) -> Option<usize> {
    let mut best_row: Option<usize> = None;
    let mut best_score = 0u32;

    'rows: for row in 0..grid.n_rows() {
        let mut has_total = false;

        for col in 0..MAX_SCAN_COLS {
            if let Some(text) = grid.value(row, col).as_text() {
                let lower = text.to_lowercase();
                if blacklist.iter().any(|term| lower.contains(term.as_str())) {
                    continue 'rows;
                }
                if lower.contains("total") {
                    has_total = true;
                }
            }
        }

        if !has_total {
            continue;
        }

        let score = 1 + formula_score(grid, row);
        if score > best_score {
            best_score = score;
            best_row = Some(row);
        }
    }

    best_row
}

fn formula_score(grid: &SheetGrid, row: usize) -> u32 {
    let mut score = 0;
    for col in 0..MAX_SCAN_COLS {
        if let Some(formula) = grid.formula(row, col) {
            let upper = formula.to_uppercase();
            if upper.starts_with(SUM_MARKER) {
                score += 2;
            } else if upper.contains('=') && upper.contains('+') {
                score += 1;
            }
        }
    }
    score
}
