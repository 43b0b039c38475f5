// Report artifacts written next to the inputs under <folder>/reports/:
// the rejection and missing-identifier CSVs plus the full JSON dump of
// extracted records. Artifacts are rewritten wholesale on every run so
// stale results never survive a re-run.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use shipcheck_engine::{AuditError, ExtractedRecord, ReconciliationOutcome};

pub const REPORTS_DIR: &str = "reports";
pub const MISSING_REPORT: &str = "missing_identifiers.csv";
pub const REJECTION_REPORT: &str = "rejection_report.csv";
pub const RECORDS_DUMP: &str = "extracted_records.json";

/// Create (or reuse) the reports directory under the input folder.
pub fn ensure_reports_dir(folder: &Path) -> Result<PathBuf, AuditError> {
    let dir = folder.join(REPORTS_DIR);
    fs::create_dir_all(&dir).map_err(|e| AuditError::WriteFailed {
        file: dir.display().to_string(),
        detail: e.to_string(),
    })?;
    Ok(dir)
}

/// Master identifiers no scanned file accounted for.
pub fn write_missing_report(
    dir: &Path,
    missing: &BTreeSet<String>,
) -> Result<PathBuf, AuditError> {
    let path = dir.join(MISSING_REPORT);
    let mut writer = csv_writer(&path)?;
    write_row(&mut writer, &path, &["identifier"])?;
    for id in missing {
        write_row(&mut writer, &path, &[id])?;
    }
    finish(writer, &path)?;
    Ok(path)
}

/// Files that were scanned but never extracted, with the reason.
pub fn write_rejection_report(
    dir: &Path,
    outcome: &ReconciliationOutcome,
) -> Result<PathBuf, AuditError> {
    let path = dir.join(REJECTION_REPORT);
    let mut writer = csv_writer(&path)?;
    write_row(&mut writer, &path, &["file", "identifier", "reason"])?;
    for file in &outcome.rejected {
        let id = file.identifier.as_deref().unwrap_or_default();
        write_row(&mut writer, &path, &[&file.file_name, id, "Unknown ID"])?;
    }
    for file in &outcome.failed_parse {
        write_row(&mut writer, &path, &[&file.file_name, "", "Parse Error"])?;
    }
    finish(writer, &path)?;
    Ok(path)
}

/// Full machine-readable dump of every extracted record.
pub fn write_records_dump(
    dir: &Path,
    records: &[ExtractedRecord],
) -> Result<PathBuf, AuditError> {
    let path = dir.join(RECORDS_DUMP);
    let json = serde_json::to_string_pretty(records).map_err(|e| AuditError::WriteFailed {
        file: path.display().to_string(),
        detail: e.to_string(),
    })?;
    fs::write(&path, json).map_err(|e| AuditError::WriteFailed {
        file: path.display().to_string(),
        detail: e.to_string(),
    })?;
    Ok(path)
}

fn csv_writer(path: &Path) -> Result<csv::Writer<fs::File>, AuditError> {
    csv::Writer::from_path(path).map_err(|e| AuditError::WriteFailed {
        file: path.display().to_string(),
        detail: e.to_string(),
    })
}

fn write_row(
    writer: &mut csv::Writer<fs::File>,
    path: &Path,
    row: &[&str],
) -> Result<(), AuditError> {
    writer.write_record(row).map_err(|e| AuditError::WriteFailed {
        file: path.display().to_string(),
        detail: e.to_string(),
    })
}

fn finish(mut writer: csv::Writer<fs::File>, path: &Path) -> Result<(), AuditError> {
    writer.flush().map_err(|e| AuditError::WriteFailed {
        file: path.display().to_string(),
        detail: e.to_string(),
    })
}
