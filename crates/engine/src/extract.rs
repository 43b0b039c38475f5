use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::alias::AliasTable;
use crate::clean::clean_numeric;
use crate::column::resolve_column;
use crate::error::AuditError;
use crate::grid::{CellValue, SheetGrid, MAX_ROLE_ROWS, MAX_SCAN_COLS};
use crate::model::{
    CanonicalField, ExtractedRecord, ExtractionStatus, FlatValue, SheetExtraction, SheetRole,
    VerifyStatus,
};
use crate::{header, total};

/// Borrowed lookup context shared by every sheet extraction in a run.
#[derive(Clone, Copy)]
pub struct ExtractContext<'a> {
    pub aliases: &'a AliasTable,
    pub blacklist: &'a [String],
}

// ---------------------------------------------------------------------------
// Sheet-level extraction
// ---------------------------------------------------------------------------

/// Extract the canonical field values from one sheet playing `role`.
///
/// The header scan feeds the `detected` set and the failure diagnostics;
/// actual column ownership is resolved per cell by the upward walk, so a
/// missing header row degrades the diagnostics, not the extraction. A
/// missing total row is fatal for the sheet: there is no aggregate row to
/// read values from.
pub fn extract_sheet(grid: &SheetGrid, role: SheetRole, ctx: ExtractContext<'_>) -> SheetExtraction {
    let mut out = SheetExtraction {
        sheet_title: grid.name().to_string(),
        role,
        header_row: None,
        total_row: None,
        status: ExtractionStatus::Ok,
        values: BTreeMap::new(),
        detected: BTreeSet::new(),
        errors: Vec::new(),
        header_probes: Vec::new(),
    };

    let scan = header::detect(grid, ctx.aliases);
    out.header_row = scan.header_row;
    out.detected = scan.fields;
    if scan.header_row.is_none() {
        if scan.probes.iter().all(|p| p.match_count == 0) {
            out.errors.push(AuditError::InvalidDocument {
                file: String::new(),
                sheet: out.sheet_title.clone(),
                reason: "no cell matched any known header alias".into(),
            });
        } else {
            out.errors.push(AuditError::HeaderNotFound {
                file: String::new(),
                sheet: out.sheet_title.clone(),
            });
        }
        out.header_probes = scan.probes;
    }

    let total_row = total::locate(grid, ctx.blacklist).filter(|&r| r < MAX_ROLE_ROWS);
    let Some(total_row) = total_row else {
        out.errors.push(AuditError::TotalRowNotFound {
            file: String::new(),
            sheet: out.sheet_title.clone(),
        });
        out.status = ExtractionStatus::Failed;
        return out;
    };
    out.total_row = Some(total_row);

    for col in 0..MAX_SCAN_COLS {
        match grid.value(total_row, col) {
            CellValue::Empty => {}
            CellValue::Text(text) if text.to_lowercase().contains("pallet") => {
                // Pallet counts ride inside the label cell ("5 PALLETS",
                // "Pallets: 5") more often than in their own column.
                if let Some(n) = parse_pallet_text(text) {
                    if n > 0.0 {
                        out.values.entry(CanonicalField::PalletCount).or_insert(n);
                        out.detected.insert(CanonicalField::PalletCount);
                    }
                }
            }
            cell => {
                let Some(field) = resolve_column(grid, total_row, col, ctx.aliases) else {
                    continue;
                };
                if !field.is_inspectable() {
                    continue;
                }
                let value = match cell {
                    CellValue::Number(n) => Some(*n),
                    CellValue::Text(text) => {
                        let cleaned = clean_numeric(text);
                        // A bare label cell ("Total:") cleans to nothing
                        // and is not a parse failure; any other text that
                        // refuses to clean is.
                        if cleaned.is_none() && !text.to_lowercase().contains("total") {
                            out.errors.push(AuditError::ValueParseError {
                                file: String::new(),
                                sheet: out.sheet_title.clone(),
                                column: col_letter(col),
                                raw: text.clone(),
                            });
                        }
                        cleaned
                    }
                    CellValue::Empty => None,
                };
                // Zeros mean "column present but empty" and never count as
                // an extracted value.
                if let Some(v) = value {
                    if v != 0.0 {
                        out.values.entry(field).or_insert(v);
                    }
                }
            }
        }
    }

    for field in role.required_fields() {
        if !out.values.contains_key(field) {
            out.errors.push(AuditError::ColumnNotFound {
                file: String::new(),
                sheet: out.sheet_title.clone(),
                field: *field,
            });
        }
    }

    out
}

/// Pallet-count ladder for free-text cells, tried in order of
/// specificity: "5 pallets", then "pallets: 5", then any bare number.
fn parse_pallet_text(text: &str) -> Option<f64> {
    static BEFORE: OnceLock<Regex> = OnceLock::new();
    static AFTER: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();
    let before =
        BEFORE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*[-_]?\s*pallet").unwrap());
    let after =
        AFTER.get_or_init(|| Regex::new(r"(?i)pallet\w*\s*[:\-]?\s*(\d+)").unwrap());
    let bare = BARE.get_or_init(|| Regex::new(r"(\d+)").unwrap());

    for re in [before, after, bare] {
        if let Some(caps) = re.captures(text) {
            if let Ok(n) = caps[1].parse::<f64>() {
                return Some(n);
            }
        }
    }
    None
}

/// Spreadsheet-style column letter for error messages (A, B, ..., AA).
fn col_letter(col: usize) -> String {
    if col < 26 {
        ((b'A' + col as u8) as char).to_string()
    } else {
        let first = (b'A' + (col / 26 - 1) as u8) as char;
        let second = (b'A' + (col % 26) as u8) as char;
        format!("{first}{second}")
    }
}

// ---------------------------------------------------------------------------
// Record-level extraction
// ---------------------------------------------------------------------------

/// Extract a full record from one workbook's sheets.
///
/// Sheets are assigned roles by title: the first invoice-titled sheet,
/// every packing-list candidate, and the first contract-titled sheet.
/// Flattening takes each field from its priority role, with one special
/// case: a pallet count absent from the invoice is backfilled from the
/// packing list, since either document is authoritative for it.
pub fn extract_record(
    file_name: &str,
    file_path: &str,
    sheets: &[SheetGrid],
    ctx: ExtractContext<'_>,
) -> ExtractedRecord {
    let mut record = ExtractedRecord {
        identifier: String::new(),
        file_name: file_name.to_string(),
        file_path: file_path.to_string(),
        invoice: None,
        packing: Vec::new(),
        contract: None,
        flattened: BTreeMap::new(),
        narrative: String::new(),
        status: VerifyStatus::Extracted,
        errors: Vec::new(),
    };

    for grid in sheets {
        let title = grid.name();
        if record.invoice.is_none() && SheetRole::Invoice.matches_title(title) {
            record.invoice = Some(stamped(extract_sheet(grid, SheetRole::Invoice, ctx), file_name));
        } else if SheetRole::PackingList.matches_title(title) {
            record
                .packing
                .push(stamped(extract_sheet(grid, SheetRole::PackingList, ctx), file_name));
        } else if record.contract.is_none() && SheetRole::Contract.matches_title(title) {
            record.contract =
                Some(stamped(extract_sheet(grid, SheetRole::Contract, ctx), file_name));
        }
    }

    if record.invoice.is_none() && record.packing.is_empty() && record.contract.is_none() {
        record.errors.push(AuditError::InvalidDocument {
            file: file_name.to_string(),
            sheet: String::new(),
            reason: "no sheet title matched any document role".into(),
        });
        return record;
    }

    for field in CanonicalField::INSPECTABLE {
        let (value, source) = match field.priority_role() {
            SheetRole::Invoice => {
                let from_invoice =
                    record.invoice.as_ref().and_then(|s| s.value(field));
                match (field, from_invoice) {
                    // Pallet backfill: packing list stands in for the invoice.
                    (CanonicalField::PalletCount, None) => (
                        record.packing.first().and_then(|s| s.value(field)),
                        SheetRole::PackingList,
                    ),
                    (_, v) => (v, SheetRole::Invoice),
                }
            }
            _ => (
                record.packing.first().and_then(|s| s.value(field)),
                SheetRole::PackingList,
            ),
        };
        if let Some(value) = value {
            record.flattened.insert(field, FlatValue { value, source });
        }
    }

    record
}

fn stamped(mut extraction: SheetExtraction, file_name: &str) -> SheetExtraction {
    extraction.errors = extraction
        .errors
        .into_iter()
        .map(|e| e.with_file(file_name))
        .collect();
    extraction
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
