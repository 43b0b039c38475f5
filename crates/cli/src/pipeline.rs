//! `shipcheck run` — the batch audit pipeline.
//!
//! Scan the folder, reconcile file names against the master register,
//! extract matched workbooks on a small worker pool, verify serially,
//! annotate the master, and write the report artifacts. Extraction is
//! the only parallel stage; everything that touches the master or the
//! artifacts runs on one thread in a deterministic order.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use serde::Serialize;

use shipcheck_engine::filename::resolve_identifier;
use shipcheck_engine::{
    extract_record, reconcile, verify, AliasTable, AuditConfig, AuditError, ExtractContext,
    ExtractedRecord, ScannedFile, VerifyStatus,
};
use shipcheck_io::master::find_master_in;
use shipcheck_io::{load_config, load_sheets, reports, scan_folder, MasterStore};

use crate::exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_MISMATCH, EXIT_USAGE};
use crate::CliError;

/// Everything one audit run produced, before any printing.
pub struct RunOutcome {
    pub records: Vec<ExtractedRecord>,
    pub missing_from_master: BTreeSet<String>,
    pub rejected: Vec<ScannedFile>,
    pub failed_parse: Vec<ScannedFile>,
    pub files_scanned: usize,
    pub master_path: Option<PathBuf>,
    pub warnings: Vec<String>,
}

pub fn cmd_run(
    folder: PathBuf,
    master: Option<PathBuf>,
    config: Option<PathBuf>,
    jobs: usize,
    json: bool,
) -> Result<(), CliError> {
    if jobs == 0 {
        return Err(CliError::usage("--jobs must be at least 1"));
    }

    let outcome = run_audit(&folder, master, config, jobs)?;

    if json {
        print_json(&folder, &outcome)?;
    } else {
        print_human(&outcome);
    }

    if outcome.records.iter().any(|r| r.status == VerifyStatus::Mismatch) {
        return Err(CliError {
            code: EXIT_MISMATCH,
            message: "verification mismatches found".into(),
            hint: None,
        });
    }
    Ok(())
}

pub fn cmd_validate(path: PathBuf) -> Result<(), CliError> {
    let raw = fs::read_to_string(&path)
        .map_err(|e| CliError::usage(format!("cannot read {}: {e}", path.display())))?;
    let config = AuditConfig::from_toml(&raw).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: e.to_string(),
        hint: None,
    })?;

    let aliases: usize = config.groups.iter().map(|g| g.mappings.len()).sum();
    println!(
        "config OK: {} groups, {} aliases, tolerance {}",
        config.groups.len(),
        aliases,
        config.tolerance.amount
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// The pipeline
// ---------------------------------------------------------------------------

pub fn run_audit(
    folder: &Path,
    master: Option<PathBuf>,
    config_path: Option<PathBuf>,
    jobs: usize,
) -> Result<RunOutcome, CliError> {
    let (config, mut warnings) =
        load_config(config_path.as_deref(), folder).map_err(audit_err)?;
    let aliases = AliasTable::from_config(&config);

    // Explicit master must exist; otherwise probe the folder, and run
    // extraction-only when there is none at all.
    let mut store = match master {
        Some(path) => Some(MasterStore::load(&path).map_err(audit_err)?),
        None => match find_master_in(folder) {
            Some(path) => Some(MasterStore::load(&path).map_err(audit_err)?),
            None => {
                warnings.push("no master register found; extraction-only run".into());
                None
            }
        },
    };

    let known_ids = store.as_ref().map(|s| s.known_ids()).unwrap_or_default();

    let mut files = scan_folder(folder).map_err(audit_err)?;
    let files_scanned = files.len();
    for file in &mut files {
        file.identifier = resolve_identifier(&file.file_name, &known_ids);
    }

    let reconciliation = reconcile(files, &known_ids);

    let reports_dir = reports::ensure_reports_dir(folder).map_err(audit_err)?;
    reports::write_rejection_report(&reports_dir, &reconciliation).map_err(audit_err)?;
    reports::write_missing_report(&reports_dir, &reconciliation.missing_from_master)
        .map_err(audit_err)?;

    let ctx = ExtractContext { aliases: &aliases, blacklist: &config.blacklist.terms };
    let mut records = extract_parallel(&reconciliation.matched, ctx, jobs);

    // Serial verification and master annotation, in file order.
    let tolerance = config.tolerance.amount;
    for record in &mut records {
        match &mut store {
            Some(store) => {
                let master_record = store.record(&record.identifier);
                let outcome = verify(record, master_record.as_ref(), tolerance);
                record.status = outcome.status;
                record.narrative = outcome.report;
                store.apply(&record.identifier, &outcome.status.to_string(), &outcome.diffs);
            }
            None => {
                // Nothing to verify against: keep the Extracted status but
                // still render the per-sheet report.
                let outcome = verify(record, None, tolerance);
                record.narrative = outcome.report;
            }
        }
    }

    if let Some(store) = &store {
        store.save().map_err(audit_err)?;
    }

    reports::write_records_dump(&reports_dir, &records).map_err(audit_err)?;

    Ok(RunOutcome {
        records,
        missing_from_master: reconciliation.missing_from_master,
        rejected: reconciliation.rejected,
        failed_parse: reconciliation.failed_parse,
        files_scanned,
        master_path: store.map(|s| s.path().to_path_buf()),
        warnings,
    })
}

/// Extract matched workbooks on a scoped worker pool. Workers pull file
/// indices from a shared counter; results are re-sorted by index so the
/// output order never depends on thread scheduling.
fn extract_parallel(
    matched: &[ScannedFile],
    ctx: ExtractContext<'_>,
    jobs: usize,
) -> Vec<ExtractedRecord> {
    let workers = jobs.min(matched.len()).max(1);
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();

    let mut indexed: Vec<(usize, ExtractedRecord)> = Vec::with_capacity(matched.len());
    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            scope.spawn(move || loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= matched.len() {
                    break;
                }
                let record = extract_one(&matched[i], ctx);
                if tx.send((i, record)).is_err() {
                    break;
                }
            });
        }
        drop(tx);
        for item in rx {
            indexed.push(item);
        }
    });

    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, record)| record).collect()
}

fn extract_one(file: &ScannedFile, ctx: ExtractContext<'_>) -> ExtractedRecord {
    let mut record = match load_sheets(&file.path) {
        Ok(sheets) => {
            extract_record(&file.file_name, &file.path.display().to_string(), &sheets, ctx)
        }
        Err(err) => ExtractedRecord {
            identifier: String::new(),
            file_name: file.file_name.clone(),
            file_path: file.path.display().to_string(),
            invoice: None,
            packing: Vec::new(),
            contract: None,
            flattened: BTreeMap::new(),
            narrative: String::new(),
            status: VerifyStatus::Extracted,
            errors: vec![err],
        },
    };
    record.identifier = file.identifier.clone().unwrap_or_default();
    record
}

fn audit_err(e: AuditError) -> CliError {
    let code = match e.code() {
        "CONFIG_PARSE" | "CONFIG_VALIDATION" => EXIT_INVALID_CONFIG,
        "FILE_NOT_FOUND" => EXIT_USAGE,
        _ => EXIT_ERROR,
    };
    CliError { code, message: e.to_string(), hint: None }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_human(outcome: &RunOutcome) {
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }

    for record in &outcome.records {
        println!("=== {} [{}]: {}", record.file_name, record.identifier, record.status);
        if !record.narrative.is_empty() {
            print!("{}", record.narrative);
        }
        for error in &record.errors {
            println!("  {error}");
        }
        for (_, extraction) in record.extractions() {
            for error in &extraction.errors {
                println!("  {error}");
            }
        }
        println!();
    }

    let verified = count(outcome, VerifyStatus::Verified);
    let mismatched = count(outcome, VerifyStatus::Mismatch);
    let missing = count(outcome, VerifyStatus::MissingFromMaster);
    println!(
        "{} scanned, {} audited: {} verified, {} mismatched, {} missing from master; {} rejected, {} unparsed",
        outcome.files_scanned,
        outcome.records.len(),
        verified,
        mismatched,
        missing,
        outcome.rejected.len(),
        outcome.failed_parse.len(),
    );
    if !outcome.missing_from_master.is_empty() {
        let ids: Vec<&str> =
            outcome.missing_from_master.iter().map(String::as_str).collect();
        println!("master rows with no document: {}", ids.join(", "));
    }
}

#[derive(Serialize)]
struct RunSummary<'a> {
    run_at: String,
    folder: String,
    master: Option<String>,
    files_scanned: usize,
    verified: usize,
    mismatched: usize,
    missing_from_master: &'a BTreeSet<String>,
    rejected: &'a [ScannedFile],
    failed_parse: &'a [ScannedFile],
    records: &'a [ExtractedRecord],
}

fn print_json(folder: &Path, outcome: &RunOutcome) -> Result<(), CliError> {
    let summary = RunSummary {
        run_at: chrono::Utc::now().to_rfc3339(),
        folder: folder.display().to_string(),
        master: outcome.master_path.as_ref().map(|p| p.display().to_string()),
        files_scanned: outcome.files_scanned,
        verified: count(outcome, VerifyStatus::Verified),
        mismatched: count(outcome, VerifyStatus::Mismatch),
        missing_from_master: &outcome.missing_from_master,
        rejected: &outcome.rejected,
        failed_parse: &outcome.failed_parse,
        records: &outcome.records,
    };
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
    println!("{json}");
    Ok(())
}

fn count(outcome: &RunOutcome, status: VerifyStatus) -> usize {
    outcome.records.iter().filter(|r| r.status == status).count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use shipcheck_engine::CanonicalField;

    const CONFIG: &str = r#"
name = "Trade Audit"

[[groups]]
name = "header_text"
[groups.mappings]
"invoice no" = "identifier"
"quantity" = "qty_area"
"amount" = "amount"
"pallet no" = "pallet_count"
"pcs" = "qty_pieces"
"net weight" = "net_weight"
"gross weight" = "gross_weight"
"cbm" = "volume"
"#;

    const MASTER_CSV: &str = "\
Invoice No,Qty,Amount,Pallets
JLF-26002,100,5005,5
JLF-26003,250,900,2
";

    fn write_invoice_workbook(path: &Path, amount: f64) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Invoice").unwrap();
        sheet.write_string(8, 0, "Invoice No").unwrap();
        sheet.write_string(8, 1, "Quantity").unwrap();
        sheet.write_string(8, 2, "Amount").unwrap();
        sheet.write_string(8, 3, "Pallet No").unwrap();
        sheet.write_string(10, 0, "Total:").unwrap();
        sheet.write_number(10, 1, 100.0).unwrap();
        sheet.write_number(10, 2, amount).unwrap();
        sheet.write_string(10, 3, "5 PALLETS").unwrap();
        workbook.save(path).unwrap();
    }

    fn setup(dir: &Path) {
        fs::write(dir.join("shipcheck.toml"), CONFIG).unwrap();
        fs::write(dir.join("Shipment Master.csv"), MASTER_CSV).unwrap();
    }

    #[test]
    fn clean_workbook_verifies_and_annotates_master() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        write_invoice_workbook(&dir.path().join("JLF-26002.xlsx"), 5005.0);

        let outcome = run_audit(dir.path(), None, None, 2).unwrap();
        assert_eq!(outcome.files_scanned, 1);
        assert_eq!(outcome.records.len(), 1);

        let record = &outcome.records[0];
        assert_eq!(record.identifier, "JLF-26002");
        assert_eq!(record.status, VerifyStatus::Verified);
        assert!(record.narrative.contains("1. Invoice (Row 9)"));

        // Master annotated in place
        let raw = fs::read_to_string(dir.path().join("Shipment Master.csv")).unwrap();
        assert!(raw.contains("VERIFY STATE"));
        assert!(raw.contains("Verified"));

        // Artifacts exist; JLF-26003 had no document
        assert!(outcome.missing_from_master.contains("JLF-26003"));
        let missing =
            fs::read_to_string(dir.path().join("reports").join("missing_identifiers.csv"))
                .unwrap();
        assert!(missing.contains("JLF-26003"));
        assert!(dir.path().join("reports").join("extracted_records.json").exists());
    }

    #[test]
    fn off_tolerance_amount_mismatches_and_records_diff() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        write_invoice_workbook(&dir.path().join("JLF-26002.xlsx"), 5010.0);

        let outcome = run_audit(dir.path(), None, None, 2).unwrap();
        let record = &outcome.records[0];
        assert_eq!(record.status, VerifyStatus::Mismatch);
        assert_eq!(
            record.flattened[&CanonicalField::Amount].value,
            5010.0
        );

        let raw = fs::read_to_string(dir.path().join("Shipment Master.csv")).unwrap();
        assert!(raw.contains("DIFF_AMOUNT"));
        assert!(raw.contains("Mismatch"));
        assert!(raw.contains(",5")); // the signed diff, rendered plainly
    }

    #[test]
    fn unknown_identifier_is_rejected_not_extracted() {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());
        write_invoice_workbook(&dir.path().join("ZZZ-9.xlsx"), 5005.0);

        let outcome = run_audit(dir.path(), None, None, 2).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.rejected.len(), 1);

        let rejection =
            fs::read_to_string(dir.path().join("reports").join("rejection_report.csv")).unwrap();
        assert!(rejection.contains("ZZZ-9.xlsx,ZZZ-9,Unknown ID"));
    }

    #[test]
    fn no_master_runs_extraction_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shipcheck.toml"), CONFIG).unwrap();
        write_invoice_workbook(&dir.path().join("JLF-26002.xlsx"), 5005.0);

        let outcome = run_audit(dir.path(), None, None, 2).unwrap();
        assert!(outcome.master_path.is_none());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].status, VerifyStatus::Extracted);
        assert!(outcome.warnings.iter().any(|w| w.contains("extraction-only")));
    }

    #[test]
    fn parallel_extraction_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shipcheck.toml"), CONFIG).unwrap();
        for i in 0..6 {
            write_invoice_workbook(&dir.path().join(format!("JLF-2600{i}.xlsx")), 5005.0);
        }

        let outcome = run_audit(dir.path(), None, None, 4).unwrap();
        let names: Vec<&str> =
            outcome.records.iter().map(|r| r.file_name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
