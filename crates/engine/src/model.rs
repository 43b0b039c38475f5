use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::header::RowProbe;

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

/// The closed set of verification-relevant fields. Every alias in a mapping
/// config must resolve onto one of these; unknown identifiers are rejected
/// at config-load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Identifier,
    QtyArea,
    Amount,
    PalletCount,
    QtyPieces,
    NetWeight,
    GrossWeight,
    Volume,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 8] = [
        Self::Identifier,
        Self::QtyArea,
        Self::Amount,
        Self::PalletCount,
        Self::QtyPieces,
        Self::NetWeight,
        Self::GrossWeight,
        Self::Volume,
    ];

    /// The seven numeric fields subject to master verification
    /// (everything except the identifier).
    pub const INSPECTABLE: [CanonicalField; 7] = [
        Self::QtyArea,
        Self::Amount,
        Self::PalletCount,
        Self::QtyPieces,
        Self::NetWeight,
        Self::GrossWeight,
        Self::Volume,
    ];

    pub fn is_inspectable(self) -> bool {
        self != Self::Identifier
    }

    /// Stable snake_case id, matching the serde representation.
    pub fn id(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::QtyArea => "qty_area",
            Self::Amount => "amount",
            Self::PalletCount => "pallet_count",
            Self::QtyPieces => "qty_pieces",
            Self::NetWeight => "net_weight",
            Self::GrossWeight => "gross_weight",
            Self::Volume => "volume",
        }
    }

    /// Short label used in report tables.
    pub fn label(self) -> &'static str {
        match self {
            Self::Identifier => "Id",
            Self::QtyArea => "Qty",
            Self::Amount => "Amount",
            Self::PalletCount => "Pallets",
            Self::QtyPieces => "Pieces",
            Self::NetWeight => "Net Wgt",
            Self::GrossWeight => "Gross Wgt",
            Self::Volume => "Volume",
        }
    }

    /// The sheet role whose value feeds the flattened record and the
    /// master-store diff write-back for this field.
    pub fn priority_role(self) -> SheetRole {
        match self {
            Self::Identifier | Self::QtyArea | Self::Amount | Self::PalletCount => {
                SheetRole::Invoice
            }
            Self::QtyPieces | Self::NetWeight | Self::GrossWeight | Self::Volume => {
                SheetRole::PackingList
            }
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

// ---------------------------------------------------------------------------
// Sheet roles
// ---------------------------------------------------------------------------

/// Logical purpose of a worksheet, as distinct from its literal title.
/// PackingList is the only role that may have multiple simultaneous
/// candidate sheets per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetRole {
    Invoice,
    PackingList,
    Contract,
}

impl SheetRole {
    pub const ALL: [SheetRole; 3] = [Self::Invoice, Self::PackingList, Self::Contract];

    /// Fields that must come out of a sheet of this role; any that are
    /// absent or uncleanable become structured errors, never silent zeros.
    pub fn required_fields(self) -> &'static [CanonicalField] {
        match self {
            Self::Invoice => &[
                CanonicalField::QtyArea,
                CanonicalField::Amount,
                CanonicalField::PalletCount,
            ],
            Self::PackingList => &[
                CanonicalField::QtyArea,
                CanonicalField::PalletCount,
                CanonicalField::QtyPieces,
                CanonicalField::NetWeight,
                CanonicalField::GrossWeight,
                CanonicalField::Volume,
            ],
            Self::Contract => &[CanonicalField::QtyArea, CanonicalField::Amount],
        }
    }

    /// Title-based role matching. Titles are compared lowercased and
    /// trimmed; the patterns come from the document conventions seen in
    /// real shipment workbooks ("INV 26002", "CT-JLF", "Packing List 2").
    pub fn matches_title(self, title: &str) -> bool {
        let t = title.trim().to_lowercase();
        match self {
            Self::Invoice => t.contains("invoice") || t.contains("inv"),
            Self::PackingList => {
                t.contains("pack")
                    || (t.contains("weight") && (t.contains("gross") || t.contains("net")))
            }
            Self::Contract => {
                t.contains("contract")
                    || t == "ct"
                    || t.starts_with("ct ")
                    || t.starts_with("ct-")
                    || t.starts_with("ct&")
                    || t.starts_with("ct_")
                    || t.ends_with(" ct")
            }
        }
    }
}

impl std::fmt::Display for SheetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invoice => write!(f, "Invoice"),
            Self::PackingList => write!(f, "PackingList"),
            Self::Contract => write!(f, "Contract"),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Ok,
    Failed,
}

/// Per (file, role, sheet instance) extraction result. Created fresh per
/// extraction pass and never mutated after being returned.
#[derive(Debug, Clone, Serialize)]
pub struct SheetExtraction {
    pub sheet_title: String,
    pub role: SheetRole,
    /// 0-based header row index, if the cluster scan found one.
    pub header_row: Option<usize>,
    /// 0-based total row index; absence means extraction could not proceed.
    pub total_row: Option<usize>,
    pub status: ExtractionStatus,
    /// Cleaned numeric value per resolved canonical field.
    pub values: BTreeMap<CanonicalField, f64>,
    /// Inspectable fields the header scan detected on this sheet.
    pub detected: BTreeSet<CanonicalField>,
    pub errors: Vec<AuditError>,
    /// Widest-row probes, populated when the header scan came up empty.
    pub header_probes: Vec<RowProbe>,
}

impl SheetExtraction {
    pub fn value(&self, field: CanonicalField) -> Option<f64> {
        self.values.get(&field).copied()
    }
}

/// A flattened best-guess value with the sheet role that supplied it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FlatValue {
    pub value: f64,
    pub source: SheetRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerifyStatus {
    Extracted,
    Verified,
    Mismatch,
    MissingFromMaster,
}

impl std::fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extracted => write!(f, "Extracted"),
            Self::Verified => write!(f, "Verified"),
            Self::Mismatch => write!(f, "Mismatch"),
            Self::MissingFromMaster => write!(f, "Missing from Master"),
        }
    }
}

/// Everything extracted from one workbook file, plus the verification
/// annotations added after comparison against the master store.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedRecord {
    pub identifier: String,
    pub file_name: String,
    pub file_path: String,
    pub invoice: Option<SheetExtraction>,
    /// All packing-list candidates; the first is the flattening default.
    pub packing: Vec<SheetExtraction>,
    pub contract: Option<SheetExtraction>,
    /// Best-guess value per field with provenance.
    pub flattened: BTreeMap<CanonicalField, FlatValue>,
    /// Human-readable verification narrative (report text).
    pub narrative: String,
    pub status: VerifyStatus,
    /// File-level errors (unreadable workbook, no recognizable sheets).
    pub errors: Vec<AuditError>,
}

impl ExtractedRecord {
    pub fn flat_value(&self, field: CanonicalField) -> Option<f64> {
        self.flattened.get(&field).map(|fv| fv.value)
    }

    /// All role extractions present on this record, packing candidates
    /// labelled with their position.
    pub fn extractions(&self) -> Vec<(String, &SheetExtraction)> {
        let mut out = Vec::new();
        if let Some(inv) = &self.invoice {
            out.push(("Invoice".to_string(), inv));
        }
        for (i, p) in self.packing.iter().enumerate() {
            let label = if i == 0 {
                "PackingList".to_string()
            } else {
                format!("PackingList #{}", i + 1)
            };
            out.push((label, p));
        }
        if let Some(ct) = &self.contract {
            out.push(("Contract".to_string(), ct));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Master records
// ---------------------------------------------------------------------------

/// The authoritative expected values for one identifier. A field absent
/// from `expected` means "no expectation", which is distinct from zero.
#[derive(Debug, Clone, Serialize)]
pub struct MasterRecord {
    pub identifier: String,
    pub expected: BTreeMap<CanonicalField, f64>,
    pub verified: Option<bool>,
    pub diffs: BTreeMap<CanonicalField, f64>,
}

impl MasterRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            expected: BTreeMap::new(),
            verified: None,
            diffs: BTreeMap::new(),
        }
    }

    pub fn expectation(&self, field: CanonicalField) -> Option<f64> {
        self.expected.get(&field).copied()
    }
}

// ---------------------------------------------------------------------------
// Scanning + reconciliation
// ---------------------------------------------------------------------------

/// One candidate workbook file discovered by the folder scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Identifier resolved from the file name, if any.
    pub identifier: Option<String>,
}

impl ScannedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, file_name, identifier: None }
    }
}

/// Disjoint partition of the scanned files, plus the master identifiers
/// no scanned file accounted for.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationOutcome {
    pub matched: Vec<ScannedFile>,
    pub rejected: Vec<ScannedFile>,
    pub failed_parse: Vec<ScannedFile>,
    pub missing_from_master: BTreeSet<String>,
}
