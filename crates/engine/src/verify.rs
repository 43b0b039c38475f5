use std::collections::BTreeMap;

use crate::grid::fmt_number;
use crate::model::{CanonicalField, ExtractedRecord, ExtractionStatus, MasterRecord, VerifyStatus};
use crate::report;

/// A field with no master expectation still fails verification when the
/// extracted value is material. Values at or below this magnitude are
/// treated as placeholder noise and tolerated.
pub const NULL_MASTER_MAGNITUDE: f64 = 1.0;

/// Result of verifying one record against the master store.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub status: VerifyStatus,
    /// Signed (extracted − expected) per field, rounded to 7 decimals.
    /// Absent master expectations count as zero here.
    pub diffs: BTreeMap<CanonicalField, f64>,
    /// The human-readable per-sheet comparison report.
    pub report: String,
    pub logic_errors: Vec<String>,
}

/// Verify a record against its master expectations.
///
/// Every inspectable field is checked on every sheet candidate that
/// produced a value, not just the flattened best guess — a packing list
/// that disagrees with the master fails the record even when the invoice
/// agrees. The diff written back to the master comes from the flattened
/// values only.
///
/// A tolerance boundary hit passes: |extracted − expected| <= tolerance.
/// Internal-consistency violations (net weight above gross weight) are
/// reported but never change the verification status on their own.
///
/// A record carrying file-level errors, or any sheet whose extraction
/// failed outright, can never come back Verified: zero checks running is
/// not the same as every check passing.
pub fn verify(
    record: &ExtractedRecord,
    master: Option<&MasterRecord>,
    tolerance: f64,
) -> VerifyOutcome {
    let logic_errors = consistency_errors(record);

    let Some(master) = master else {
        return VerifyOutcome {
            status: VerifyStatus::MissingFromMaster,
            diffs: BTreeMap::new(),
            report: report::build_report(record, None, &logic_errors),
            logic_errors,
        };
    };

    let mut mismatch = !record.errors.is_empty()
        || record
            .extractions()
            .iter()
            .any(|(_, e)| e.status == ExtractionStatus::Failed);
    for field in CanonicalField::INSPECTABLE {
        for (_, extraction) in record.extractions() {
            let Some(value) = extraction.value(field) else {
                continue;
            };
            match master.expectation(field) {
                None => {
                    if value > NULL_MASTER_MAGNITUDE {
                        mismatch = true;
                    }
                }
                Some(expected) => {
                    // Compare the rounded diff: raw f64 subtraction turns
                    // 100.01 - 100.0 into 0.010000000000005, which would
                    // fail a 0.01 tolerance it should exactly meet.
                    if round7(value - expected).abs() > tolerance {
                        mismatch = true;
                    }
                }
            }
        }
    }

    let mut diffs = BTreeMap::new();
    for field in CanonicalField::INSPECTABLE {
        if let Some(flat) = record.flat_value(field) {
            let expected = master.expectation(field).unwrap_or(0.0);
            diffs.insert(field, round7(flat - expected));
        }
    }

    let status = if mismatch { VerifyStatus::Mismatch } else { VerifyStatus::Verified };

    VerifyOutcome {
        status,
        diffs,
        report: report::build_report(record, Some(master), &logic_errors),
        logic_errors,
    }
}

/// Net weight can never exceed gross weight; when a packing candidate
/// says otherwise, one of the two columns was misread upstream.
fn consistency_errors(record: &ExtractedRecord) -> Vec<String> {
    let mut out = Vec::new();
    for extraction in &record.packing {
        let (Some(net), Some(gross)) = (
            extraction.value(CanonicalField::NetWeight),
            extraction.value(CanonicalField::GrossWeight),
        ) else {
            continue;
        };
        if net > gross {
            out.push(format!(
                "Net Weight ({}) > Gross Weight ({})",
                fmt_number(net),
                fmt_number(gross)
            ));
        }
    }
    out
}

/// Round to 7 decimal places, taming float noise in stored diffs.
pub(crate) fn round7(x: f64) -> f64 {
    (x * 1e7).round() / 1e7
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::model::{ExtractionStatus, SheetExtraction, SheetRole};
    use std::collections::BTreeSet;

    fn extraction(
        role: SheetRole,
        title: &str,
        values: &[(CanonicalField, f64)],
    ) -> SheetExtraction {
        SheetExtraction {
            sheet_title: title.to_string(),
            role,
            header_row: Some(8),
            total_row: Some(10),
            status: ExtractionStatus::Ok,
            values: values.iter().copied().collect(),
            detected: values.iter().map(|(f, _)| *f).collect::<BTreeSet<_>>(),
            errors: Vec::<AuditError>::new(),
            header_probes: Vec::new(),
        }
    }

    fn record(invoice: &[(CanonicalField, f64)], packing: &[(CanonicalField, f64)]) -> ExtractedRecord {
        let mut rec = ExtractedRecord {
            identifier: "JLF-26002".into(),
            file_name: "JLF-26002.xlsx".into(),
            file_path: "/in/JLF-26002.xlsx".into(),
            invoice: Some(extraction(SheetRole::Invoice, "Invoice", invoice)),
            packing: if packing.is_empty() {
                Vec::new()
            } else {
                vec![extraction(SheetRole::PackingList, "Packing List", packing)]
            },
            contract: None,
            flattened: BTreeMap::new(),
            narrative: String::new(),
            status: VerifyStatus::Extracted,
            errors: Vec::new(),
        };
        for (field, value) in invoice.iter().chain(packing) {
            rec.flattened.entry(*field).or_insert(crate::model::FlatValue {
                value: *value,
                source: field.priority_role(),
            });
        }
        rec
    }

    fn master(values: &[(CanonicalField, f64)]) -> MasterRecord {
        let mut m = MasterRecord::new("JLF-26002");
        m.expected = values.iter().copied().collect();
        m
    }

    #[test]
    fn all_within_tolerance_verifies() {
        let rec = record(
            &[(CanonicalField::QtyArea, 100.0), (CanonicalField::Amount, 5005.0)],
            &[],
        );
        let m = master(&[(CanonicalField::QtyArea, 100.0), (CanonicalField::Amount, 5005.0)]);
        let out = verify(&rec, Some(&m), 0.01);
        assert_eq!(out.status, VerifyStatus::Verified);
        assert_eq!(out.diffs[&CanonicalField::QtyArea], 0.0);
        assert_eq!(out.diffs[&CanonicalField::Amount], 0.0);
    }

    #[test]
    fn tolerance_boundary_passes_beyond_fails() {
        let m = master(&[(CanonicalField::Amount, 100.0)]);

        let rec = record(&[(CanonicalField::Amount, 100.01)], &[]);
        assert_eq!(verify(&rec, Some(&m), 0.01).status, VerifyStatus::Verified);

        let rec = record(&[(CanonicalField::Amount, 100.02)], &[]);
        assert_eq!(verify(&rec, Some(&m), 0.01).status, VerifyStatus::Mismatch);
    }

    #[test]
    fn tolerance_boundary_survives_float_noise() {
        // 0.3 - 0.1 is 0.20000000000000004 in raw f64 arithmetic; the
        // comparison must not fail a diff that meets the tolerance exactly.
        let m = master(&[(CanonicalField::Amount, 0.1)]);
        let rec = record(&[(CanonicalField::Amount, 0.3)], &[]);
        assert_eq!(verify(&rec, Some(&m), 0.2).status, VerifyStatus::Verified);
    }

    #[test]
    fn every_candidate_is_checked() {
        // Invoice agrees with the master; the packing list does not.
        let rec = record(
            &[(CanonicalField::QtyArea, 100.0)],
            &[(CanonicalField::QtyArea, 90.0)],
        );
        let m = master(&[(CanonicalField::QtyArea, 100.0)]);
        let out = verify(&rec, Some(&m), 0.01);
        assert_eq!(out.status, VerifyStatus::Mismatch);
        // Flattened diff still reflects the invoice value
        assert_eq!(out.diffs[&CanonicalField::QtyArea], 0.0);
    }

    #[test]
    fn null_expectation_tolerates_small_values_only() {
        let m = master(&[(CanonicalField::QtyArea, 100.0)]); // no Volume expectation

        let rec = record(
            &[(CanonicalField::QtyArea, 100.0)],
            &[(CanonicalField::Volume, 0.5)],
        );
        assert_eq!(verify(&rec, Some(&m), 0.01).status, VerifyStatus::Verified);

        let rec = record(
            &[(CanonicalField::QtyArea, 100.0)],
            &[(CanonicalField::Volume, 12.3)],
        );
        let out = verify(&rec, Some(&m), 0.01);
        assert_eq!(out.status, VerifyStatus::Mismatch);
        // Null expectation counts as zero in the diff
        assert_eq!(out.diffs[&CanonicalField::Volume], 12.3);
    }

    #[test]
    fn missing_master_record() {
        let rec = record(&[(CanonicalField::QtyArea, 100.0)], &[]);
        let out = verify(&rec, None, 0.01);
        assert_eq!(out.status, VerifyStatus::MissingFromMaster);
        assert!(out.diffs.is_empty());
        assert!(!out.report.is_empty());
    }

    #[test]
    fn net_above_gross_is_reported_not_failed() {
        let rec = record(
            &[],
            &[
                (CanonicalField::NetWeight, 1300.0),
                (CanonicalField::GrossWeight, 1250.0),
            ],
        );
        let m = master(&[
            (CanonicalField::NetWeight, 1300.0),
            (CanonicalField::GrossWeight, 1250.0),
        ]);
        let out = verify(&rec, Some(&m), 0.01);
        assert_eq!(out.status, VerifyStatus::Verified);
        assert_eq!(out.logic_errors.len(), 1);
        assert!(out.logic_errors[0].contains("1300"));
        assert!(out.report.contains("[!] Critical Logic Error"));
    }

    #[test]
    fn file_level_error_blocks_verified() {
        // An unreadable workbook produces a record with no values at all;
        // zero passing checks must not read as a clean verification.
        let mut rec = record(&[], &[]);
        rec.invoice = None;
        rec.errors.push(AuditError::FileUnreadable {
            file: "JLF-26002.xlsx".into(),
            detail: "not a zip archive".into(),
        });
        let m = master(&[(CanonicalField::QtyArea, 100.0)]);
        assert_eq!(verify(&rec, Some(&m), 0.01).status, VerifyStatus::Mismatch);
    }

    #[test]
    fn failed_sheet_extraction_blocks_verified() {
        let mut rec = record(&[(CanonicalField::QtyArea, 100.0)], &[]);
        let mut failed = extraction(SheetRole::PackingList, "Packing List", &[]);
        failed.status = ExtractionStatus::Failed;
        failed.total_row = None;
        rec.packing.push(failed);
        let m = master(&[(CanonicalField::QtyArea, 100.0)]);
        assert_eq!(verify(&rec, Some(&m), 0.01).status, VerifyStatus::Mismatch);
    }

    #[test]
    fn diffs_are_rounded() {
        let rec = record(&[(CanonicalField::Amount, 0.3)], &[]);
        let m = master(&[(CanonicalField::Amount, 0.1)]);
        let out = verify(&rec, Some(&m), 1.0);
        assert_eq!(out.diffs[&CanonicalField::Amount], 0.2);
    }

    #[test]
    fn verification_is_idempotent() {
        let rec = record(
            &[(CanonicalField::QtyArea, 100.0), (CanonicalField::Amount, 5005.0)],
            &[(CanonicalField::NetWeight, 1200.5)],
        );
        let m = master(&[
            (CanonicalField::QtyArea, 100.0),
            (CanonicalField::Amount, 5005.0),
            (CanonicalField::NetWeight, 1200.5),
        ]);
        let first = verify(&rec, Some(&m), 0.01);
        let second = verify(&rec, Some(&m), 0.01);
        assert_eq!(first.status, second.status);
        assert_eq!(first.diffs, second.diffs);
        assert_eq!(first.report, second.report);
    }
}
