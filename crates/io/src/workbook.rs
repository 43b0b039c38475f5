// Workbook import (xlsx, xls, xlsb, ods)
//
// One-way conversion: files are loaded into the engine's bounded grid
// model with aligned value and formula views. Nothing is written back.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use shipcheck_engine::{AuditError, SheetGrid};

/// Load every sheet of a workbook into bounded grids.
///
/// Values come from the evaluated range; formula text comes from the
/// aligned formula range with a leading '=' restored (calamine strips
/// it). Anything past the grid's scan caps is silently truncated — the
/// engine never looks there.
pub fn load_sheets(path: &Path) -> Result<Vec<SheetGrid>, AuditError> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if !path.exists() {
        return Err(AuditError::FileNotFound { file });
    }

    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| AuditError::FileUnreadable { file: file.clone(), detail: e.to_string() })?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(AuditError::FileUnreadable {
            file,
            detail: "workbook contains no sheets".into(),
        });
    }

    let mut grids = Vec::with_capacity(sheet_names.len());

    for sheet_name in &sheet_names {
        let range = workbook.worksheet_range(sheet_name).map_err(|e| {
            AuditError::FileUnreadable {
                file: file.clone(),
                detail: format!("sheet '{sheet_name}': {e}"),
            }
        })?;

        let mut grid = SheetGrid::new(sheet_name.clone());

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        for (row_idx, row) in range.rows().enumerate() {
            let target_row = start_row as usize + row_idx;
            for (col_idx, cell) in row.iter().enumerate() {
                let target_col = start_col as usize + col_idx;
                match cell {
                    Data::Empty => {}
                    Data::String(s) => {
                        if !s.is_empty() {
                            grid.set_text(target_row, target_col, s.clone());
                        }
                    }
                    Data::Float(n) => grid.set_number(target_row, target_col, *n),
                    Data::Int(n) => grid.set_number(target_row, target_col, *n as f64),
                    Data::Bool(b) => {
                        grid.set_text(target_row, target_col, if *b { "TRUE" } else { "FALSE" });
                    }
                    Data::Error(e) => {
                        grid.set_text(target_row, target_col, format!("#{e:?}"));
                    }
                    Data::DateTime(dt) => {
                        // Serial value; totals are never dates, so the raw
                        // number is the most honest representation.
                        grid.set_number(target_row, target_col, dt.as_f64());
                    }
                    Data::DateTimeIso(s) | Data::DurationIso(s) => {
                        grid.set_text(target_row, target_col, s.clone());
                    }
                }
            }
        }

        if let Ok(formula_range) = workbook.worksheet_formula(sheet_name) {
            let (f_start_row, f_start_col) = formula_range.start().unwrap_or((0, 0));
            for (row_idx, row) in formula_range.rows().enumerate() {
                let target_row = f_start_row as usize + row_idx;
                for (col_idx, formula) in row.iter().enumerate() {
                    let target_col = f_start_col as usize + col_idx;
                    if !formula.is_empty() {
                        let text = if formula.starts_with('=') {
                            formula.clone()
                        } else {
                            format!("={formula}")
                        };
                        grid.set_formula(target_row, target_col, text);
                    }
                }
            }
        }

        grids.push(grid);
    }

    Ok(grids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_structured_error() {
        let err = load_sheets(Path::new("/nonexistent/box.xlsx")).unwrap_err();
        assert_eq!(err.code(), "FILE_NOT_FOUND");
    }
}
