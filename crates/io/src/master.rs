// Master store: the authoritative expectations table.
//
// Loaded from CSV or Excel with fuzzy header mapping, annotated with
// verification state and per-field diffs, and written back in one
// atomic rewrite (temp file + rename) so a crashed run never leaves a
// half-written master behind.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use shipcheck_engine::clean::clean_numeric;
use shipcheck_engine::grid::fmt_number;
use shipcheck_engine::{AuditError, CanonicalField, MasterRecord};

/// Reserved output column holding the verification status per row.
pub const VERIFY_STATE_COLUMN: &str = "VERIFY STATE";

/// Reserved output column for a field's signed diff, or `None` for the
/// identifier. These names are stable across runs: the loader skips any
/// header containing "diff" or "verify" during mapping, so a previously
/// annotated master re-loads cleanly.
pub fn diff_column(field: CanonicalField) -> Option<&'static str> {
    match field {
        CanonicalField::Identifier => None,
        CanonicalField::QtyArea => Some("DIFF_SQFT"),
        CanonicalField::Amount => Some("DIFF_AMOUNT"),
        CanonicalField::PalletCount => Some("DIFF_PALLET"),
        CanonicalField::QtyPieces => Some("DIFF_PCS"),
        CanonicalField::NetWeight => Some("DIFF_NET"),
        CanonicalField::GrossWeight => Some("DIFF_GROSS"),
        CanonicalField::Volume => Some("DIFF_CBM"),
    }
}

/// The master table held in memory: raw cells plus the fuzzy column
/// mapping resolved at load time. Unmapped columns ride along untouched
/// and survive the save.
#[derive(Debug, Clone)]
pub struct MasterStore {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    id_col: usize,
    field_cols: BTreeMap<CanonicalField, usize>,
}

impl MasterStore {
    /// Load a master file, CSV or Excel by extension.
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let file = display_name(path);
        if !path.exists() {
            return Err(AuditError::FileNotFound { file });
        }

        let table = match extension(path).as_str() {
            "csv" => read_csv(path, &file)?,
            _ => read_excel(path, &file)?,
        };

        let (headers, rows) = split_header(table, &file)?;
        let (id_col, field_cols) = map_columns(&headers, &file)?;

        Ok(Self { path: path.to_path_buf(), headers, rows, id_col, field_cols })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn known_ids(&self) -> BTreeSet<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(self.id_col))
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }

    /// Expectations for one identifier, if the master has a row for it.
    /// Blank cells yield no expectation, which is distinct from zero.
    pub fn record(&self, identifier: &str) -> Option<MasterRecord> {
        let row = self.row_for(identifier)?;
        let mut record = MasterRecord::new(identifier);
        for (field, col) in &self.field_cols {
            let Some(cell) = row.get(*col) else { continue };
            if cell.trim().is_empty() {
                continue;
            }
            if let Some(value) = clean_numeric(cell) {
                record.expected.insert(*field, value);
            }
        }
        Some(record)
    }

    /// Write the verification status and diffs onto a row. Reserved
    /// columns are created on first use. Returns false when the
    /// identifier has no master row.
    pub fn apply(
        &mut self,
        identifier: &str,
        status: &str,
        diffs: &BTreeMap<CanonicalField, f64>,
    ) -> bool {
        let Some(row_idx) = self
            .rows
            .iter()
            .position(|row| row.get(self.id_col).map(|c| c.trim()) == Some(identifier))
        else {
            return false;
        };

        let verify_col = self.ensure_column(VERIFY_STATE_COLUMN);
        set_cell(&mut self.rows[row_idx], verify_col, status.to_string());

        for (field, diff) in diffs {
            let Some(name) = diff_column(*field) else { continue };
            let col = self.ensure_column(name);
            set_cell(&mut self.rows[row_idx], col, fmt_number(*diff));
        }
        true
    }

    /// Persist the table back to its source path in one atomic rewrite.
    pub fn save(&self) -> Result<(), AuditError> {
        let file = display_name(&self.path);
        let tmp = self.path.with_extension("tmp");

        match extension(&self.path).as_str() {
            "csv" => write_csv(&tmp, &self.headers, &self.rows, &file)?,
            _ => write_excel(&tmp, &self.headers, &self.rows, &file)?,
        }

        fs::rename(&tmp, &self.path)
            .map_err(|e| AuditError::WriteFailed { file, detail: e.to_string() })
    }

    fn row_for(&self, identifier: &str) -> Option<&Vec<String>> {
        self.rows
            .iter()
            .find(|row| row.get(self.id_col).map(|c| c.trim()) == Some(identifier))
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        match self.headers.iter().position(|h| h == name) {
            Some(col) => col,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        }
    }
}

/// Find the master file in a folder: any CSV/Excel file whose name
/// mentions "master", ignoring editor lock files. Alphabetical first
/// match, so the choice is stable run to run.
pub fn find_master_in(folder: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(folder)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            !name.starts_with("~$")
                && name.contains("master")
                && matches!(extension(path).as_str(), "csv" | "xlsx" | "xls")
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

fn map_columns(
    headers: &[String],
    file: &str,
) -> Result<(usize, BTreeMap<CanonicalField, usize>), AuditError> {
    let mut id_col = None;
    let mut field_cols: BTreeMap<CanonicalField, usize> = BTreeMap::new();

    for (col, header) in headers.iter().enumerate() {
        let h = header.trim().to_lowercase();
        // Reserved output columns from a previous run never map back in.
        if h.contains("diff") || h.contains("verify") {
            continue;
        }

        if id_col.is_none() && (h.contains("invoice") || h.contains("id")) {
            id_col = Some(col);
            continue;
        }

        let field = if h.contains("pallet") {
            Some(CanonicalField::PalletCount)
        } else if h.contains("pcs") || h.contains("piece") {
            Some(CanonicalField::QtyPieces)
        } else if h.contains("net") {
            Some(CanonicalField::NetWeight)
        } else if h.contains("gross") {
            Some(CanonicalField::GrossWeight)
        } else if h.contains("cbm") || h.contains("volume") {
            Some(CanonicalField::Volume)
        } else if h.contains("amount") || h.contains("value") {
            Some(CanonicalField::Amount)
        } else if h.contains("sqft") || h.contains("sq.ft") || h.contains("qty") || h.contains("quantity") {
            Some(CanonicalField::QtyArea)
        } else {
            None
        };

        if let Some(field) = field {
            field_cols.entry(field).or_insert(col);
        }
    }

    let id_col = id_col.ok_or_else(|| AuditError::ValidationError {
        file: file.to_string(),
        sheet: String::new(),
        detail: "no identifier column (expected a header containing 'invoice' or 'id')".into(),
    })?;

    Ok((id_col, field_cols))
}

// ---------------------------------------------------------------------------
// Read / write backends
// ---------------------------------------------------------------------------

fn read_csv(path: &Path, file: &str) -> Result<Vec<Vec<String>>, AuditError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AuditError::FileUnreadable { file: file.to_string(), detail: e.to_string() })?;

    let mut table = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AuditError::FileUnreadable {
            file: file.to_string(),
            detail: e.to_string(),
        })?;
        table.push(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

fn read_excel(path: &Path, file: &str) -> Result<Vec<Vec<String>>, AuditError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| AuditError::FileUnreadable { file: file.to_string(), detail: e.to_string() })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AuditError::FileUnreadable {
            file: file.to_string(),
            detail: "workbook contains no sheets".into(),
        })?;

    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        AuditError::FileUnreadable { file: file.to_string(), detail: e.to_string() }
    })?;

    let mut table = Vec::new();
    for row in range.rows() {
        let cells = row
            .iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                Data::String(s) => s.clone(),
                Data::Float(n) => fmt_number(*n),
                Data::Int(n) => n.to_string(),
                Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
                Data::Error(e) => format!("#{e:?}"),
                Data::DateTime(dt) => fmt_number(dt.as_f64()),
                Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
            })
            .collect();
        table.push(cells);
    }
    Ok(table)
}

fn write_csv(
    path: &Path,
    headers: &[String],
    rows: &[Vec<String>],
    file: &str,
) -> Result<(), AuditError> {
    let map_err =
        |e: csv::Error| AuditError::WriteFailed { file: file.to_string(), detail: e.to_string() };

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AuditError::WriteFailed { file: file.to_string(), detail: e.to_string() })?;
    writer.write_record(headers).map_err(map_err)?;
    for row in rows {
        let mut padded = row.clone();
        padded.resize(headers.len(), String::new());
        writer.write_record(&padded).map_err(map_err)?;
    }
    writer
        .flush()
        .map_err(|e| AuditError::WriteFailed { file: file.to_string(), detail: e.to_string() })
}

fn write_excel(
    path: &Path,
    headers: &[String],
    rows: &[Vec<String>],
    file: &str,
) -> Result<(), AuditError> {
    let map_err = |e: rust_xlsxwriter::XlsxError| AuditError::WriteFailed {
        file: file.to_string(),
        detail: e.to_string(),
    };

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Master").map_err(map_err)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header).map_err(map_err)?;
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            let (r, c) = ((row_idx + 1) as u32, col as u16);
            // Numeric cells go back as numbers so Excel keeps treating
            // them as values, not text.
            match cell.parse::<f64>() {
                Ok(n) => worksheet.write_number(r, c, n).map_err(map_err)?,
                Err(_) => worksheet.write_string(r, c, cell).map_err(map_err)?,
            };
        }
    }

    workbook.save(path).map_err(map_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn split_header(
    mut table: Vec<Vec<String>>,
    file: &str,
) -> Result<(Vec<String>, Vec<Vec<String>>), AuditError> {
    if table.is_empty() {
        return Err(AuditError::ValidationError {
            file: file.to_string(),
            sheet: String::new(),
            detail: "master file is empty".into(),
        });
    }
    let headers = table.remove(0);
    Ok((headers, table))
}

fn set_cell(row: &mut Vec<String>, col: usize, value: String) {
    if row.len() <= col {
        row.resize(col + 1, String::new());
    }
    row[col] = value;
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
