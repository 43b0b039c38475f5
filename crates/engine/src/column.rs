use crate::alias::AliasTable;
use crate::grid::SheetGrid;
use crate::model::CanonicalField;

/// Resolve which canonical field owns a cell by walking upward from the
/// row above `data_row` to the top of the sheet in the same column,
/// taking the nearest cell that resolves through the alias table (or the
/// legacy amount fallback). A per-column walk, rather than one global
/// header row, tolerates headers offset by a row or two between columns —
/// the merged-cell layouts these documents love.
pub fn resolve_column(
    grid: &SheetGrid,
    data_row: usize,
    col: usize,
    aliases: &AliasTable,
) -> Option<CanonicalField> {
    for row in (0..data_row).rev() {
        let Some(text) = grid.text(row, col) else {
            continue;
        };
        if let Some(field) = aliases.resolve_with_fallback(&text) {
            return Some(field);
        }
    }
    None
}
