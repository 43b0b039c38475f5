use std::fmt::Write;

use crate::grid::fmt_number;
use crate::model::{CanonicalField, ExtractedRecord, MasterRecord};
use crate::verify::round7;

/// Render the per-sheet comparison report for one record.
///
/// One numbered section per extracted sheet, located by its detected
/// header row (or a warning when none was found), each with a fixed-width
/// Field/Current/Master/Variance table over the inspectable fields the
/// sheet produced. Row numbers are 1-based, matching what the user sees
/// in their spreadsheet application.
pub fn build_report(
    record: &ExtractedRecord,
    master: Option<&MasterRecord>,
    logic_errors: &[String],
) -> String {
    let mut out = String::new();

    for (i, (label, extraction)) in record.extractions().into_iter().enumerate() {
        let location = match extraction.header_row {
            Some(row) => format!("(Row {})", row + 1),
            None => "(WARNING: No header row found (need 3+ matches))".to_string(),
        };
        let _ = writeln!(out, "{}. {} {}", i + 1, label, location);

        let fields: Vec<CanonicalField> = CanonicalField::INSPECTABLE
            .into_iter()
            .filter(|f| extraction.value(*f).is_some())
            .collect();

        if fields.is_empty() {
            out.push_str("   (No inspectable data detected)\n");
            continue;
        }

        let _ = writeln!(
            out,
            "   {:<10} {:<10} {:<10} {}",
            "Field", "Current", "Master", "Variance"
        );
        for field in fields {
            let current = extraction.value(field).unwrap_or_default();
            let expected = master.and_then(|m| m.expectation(field));
            let _ = writeln!(
                out,
                "   {:<10} {:<10} {:<10} {}",
                field.label(),
                fmt_number(current),
                expected.map(fmt_number).unwrap_or_else(|| "N/A".to_string()),
                variance_cell(current, expected, master.is_some()),
            );
        }
    }

    for error in logic_errors {
        let _ = writeln!(out, "[!] Critical Logic Error: {error}");
    }

    out
}

/// Variance column: "N/A" without a comparable expectation, "-" for an
/// exact match, signed two-decimal delta otherwise.
fn variance_cell(current: f64, expected: Option<f64>, has_master: bool) -> String {
    if !has_master {
        return "N/A".to_string();
    }
    let Some(expected) = expected else {
        return "N/A".to_string();
    };
    let diff = round7(current - expected);
    if diff == 0.0 {
        "-".to_string()
    } else {
        format!("{diff:+.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::model::{
        ExtractionStatus, FlatValue, SheetExtraction, SheetRole, VerifyStatus,
    };
    use std::collections::{BTreeMap, BTreeSet};

    fn extraction(
        role: SheetRole,
        title: &str,
        total_row: Option<usize>,
        header_row: Option<usize>,
        values: &[(CanonicalField, f64)],
    ) -> SheetExtraction {
        SheetExtraction {
            sheet_title: title.to_string(),
            role,
            header_row,
            total_row,
            status: ExtractionStatus::Ok,
            values: values.iter().copied().collect(),
            detected: values.iter().map(|(f, _)| *f).collect::<BTreeSet<_>>(),
            errors: Vec::<AuditError>::new(),
            header_probes: Vec::new(),
        }
    }

    fn record(invoice: SheetExtraction, packing: Vec<SheetExtraction>) -> ExtractedRecord {
        ExtractedRecord {
            identifier: "JLF-26002".into(),
            file_name: "JLF-26002.xlsx".into(),
            file_path: "/in/JLF-26002.xlsx".into(),
            invoice: Some(invoice),
            packing,
            contract: None,
            flattened: BTreeMap::<CanonicalField, FlatValue>::new(),
            narrative: String::new(),
            status: VerifyStatus::Extracted,
            errors: Vec::new(),
        }
    }

    fn master(values: &[(CanonicalField, f64)]) -> MasterRecord {
        let mut m = MasterRecord::new("JLF-26002");
        m.expected = values.iter().copied().collect();
        m
    }

    #[test]
    fn sections_are_numbered_with_one_based_rows() {
        let rec = record(
            extraction(
                SheetRole::Invoice,
                "Invoice",
                Some(10),
                Some(8),
                &[(CanonicalField::QtyArea, 100.0)],
            ),
            vec![
                extraction(SheetRole::PackingList, "PL 1", Some(7), Some(4), &[]),
                extraction(SheetRole::PackingList, "PL 2", Some(9), Some(6), &[]),
            ],
        );
        let m = master(&[(CanonicalField::QtyArea, 100.0)]);
        let report = build_report(&rec, Some(&m), &[]);
        // The location is the detected header row, 1-based
        assert!(report.contains("1. Invoice (Row 9)"));
        assert!(report.contains("2. PackingList (Row 5)"));
        assert!(report.contains("3. PackingList #2 (Row 7)"));
    }

    #[test]
    fn variance_column_formatting() {
        let rec = record(
            extraction(
                SheetRole::Invoice,
                "Invoice",
                Some(10),
                Some(8),
                &[
                    (CanonicalField::QtyArea, 100.0),
                    (CanonicalField::Amount, 5007.5),
                    (CanonicalField::Volume, 12.3),
                ],
            ),
            Vec::new(),
        );
        let m = master(&[
            (CanonicalField::QtyArea, 100.0),
            (CanonicalField::Amount, 5005.0),
        ]);
        let report = build_report(&rec, Some(&m), &[]);
        // Exact match renders as a dash
        assert!(report.contains("Qty        100        100        -"));
        // Signed two-decimal delta
        assert!(report.contains("Amount     5007.5     5005       +2.50"));
        // No expectation at all
        assert!(report.contains("Volume     12.3       N/A        N/A"));
    }

    #[test]
    fn missing_master_shows_na_everywhere() {
        let rec = record(
            extraction(
                SheetRole::Invoice,
                "Invoice",
                Some(10),
                Some(8),
                &[(CanonicalField::QtyArea, 100.0)],
            ),
            Vec::new(),
        );
        let report = build_report(&rec, None, &[]);
        assert!(report.contains("Qty        100        N/A        N/A"));
    }

    #[test]
    fn empty_extraction_note() {
        let rec = record(
            extraction(SheetRole::Invoice, "Invoice", Some(10), Some(8), &[]),
            Vec::new(),
        );
        let report = build_report(&rec, None, &[]);
        assert!(report.contains("(No inspectable data detected)"));
    }

    #[test]
    fn missing_header_row_warns_even_when_total_row_found() {
        let rec = record(
            extraction(SheetRole::Invoice, "Invoice", Some(10), None, &[]),
            vec![extraction(SheetRole::PackingList, "PL", None, Some(4), &[])],
        );
        let report = build_report(&rec, None, &[]);
        assert!(report.contains("1. Invoice (WARNING: No header row found (need 3+ matches))"));
        assert!(!report.contains("1. Invoice (Row"));
        assert!(report.contains("2. PackingList (Row 5)"));
    }

    #[test]
    fn logic_errors_are_appended() {
        let rec = record(
            extraction(SheetRole::Invoice, "Invoice", Some(10), Some(8), &[]),
            Vec::new(),
        );
        let errors = vec!["Net Weight (1300) > Gross Weight (1250)".to_string()];
        let report = build_report(&rec, None, &errors);
        assert!(report
            .contains("[!] Critical Logic Error: Net Weight (1300) > Gross Weight (1250)"));
    }
}
