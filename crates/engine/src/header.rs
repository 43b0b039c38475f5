use std::collections::BTreeSet;

use serde::Serialize;

use crate::alias::AliasTable;
use crate::grid::{SheetGrid, MAX_HEADER_ROWS, MAX_SCAN_COLS};
use crate::model::CanonicalField;

/// A row must carry at least this many distinct canonical matches to be
/// accepted as a header row. Two matches is what a stray "Amount ...
/// Total" narrative line produces; three is a real column header band.
const MIN_HEADER_MATCHES: usize = 3;

/// How many widest rows to describe when detection fails.
const PROBE_LIMIT: usize = 5;

/// Diagnostic probe for one row: how wide it is and how many of its cells
/// resolved to canonical fields.
#[derive(Debug, Clone, Serialize)]
pub struct RowProbe {
    pub row: usize,
    pub cell_count: usize,
    pub match_count: usize,
}

/// Result of the header-cluster scan. `header_row` of `None` is an
/// answer, not an error — the caller decides how to treat it.
#[derive(Debug, Clone)]
pub struct HeaderScan {
    pub header_row: Option<usize>,
    /// Inspectable fields detected on the header row (and its sub-header).
    pub fields: BTreeSet<CanonicalField>,
    /// Top widest rows with their match counts, for the failure diagnostic.
    pub probes: Vec<RowProbe>,
}

/// Find the header row: the row within the first 50 with the most cells
/// resolving to canonical fields, requiring at least 3 distinct matches.
/// Ties go to the topmost row. The immediately following row is merged in
/// when it also yields matches (two-line sub-headers, e.g. a "PCS" column
/// under a merged "Quantity" band).
pub fn detect(grid: &SheetGrid, aliases: &AliasTable) -> HeaderScan {
    let max_row = grid.n_rows().min(MAX_HEADER_ROWS);

    let mut best_row: Option<usize> = None;
    let mut best_fields: BTreeSet<CanonicalField> = BTreeSet::new();
    let mut probes: Vec<RowProbe> = Vec::new();

    for row in 0..max_row {
        let fields = row_matches(grid, aliases, row);
        let cell_count = grid.row_cell_count(row);
        if cell_count > 0 {
            probes.push(RowProbe { row, cell_count, match_count: fields.len() });
        }

        // Strictly-more wins, so the topmost qualifying row takes ties.
        if fields.len() >= MIN_HEADER_MATCHES && fields.len() > best_fields.len() {
            best_row = Some(row);
            best_fields = fields;
        }
    }

    if let Some(row) = best_row {
        // Merge sub-header matches from the following row.
        for field in row_matches(grid, aliases, row + 1) {
            best_fields.insert(field);
        }
        best_fields.retain(|f| f.is_inspectable());
        return HeaderScan { header_row: Some(row), fields: best_fields, probes: Vec::new() };
    }

    // Not found: keep the top-5 widest rows as the diagnostic.
    probes.sort_by(|a, b| b.cell_count.cmp(&a.cell_count).then(a.row.cmp(&b.row)));
    probes.truncate(PROBE_LIMIT);

    HeaderScan { header_row: None, fields: BTreeSet::new(), probes }
}

/// Distinct canonical fields resolved from one row's cells.
fn row_matches(grid: &SheetGrid, aliases: &AliasTable, row: usize) -> BTreeSet<CanonicalField> {
    let mut fields = BTreeSet::new();
    for col in 0..MAX_SCAN_COLS {
        if let Some(text) = grid.text(row, col) {
            if let Some(field) = aliases.resolve_with_fallback(&text) {
                fields.insert(field);
            }
        }
    }
    fields
}
