//! `shipcheck-engine` — Heuristic extraction and verification engine.
//!
//! Pure engine crate: receives pre-loaded sheet grids and master records,
//! returns structured extraction/verification results. No CLI or IO
//! dependencies.

pub mod alias;
pub mod clean;
pub mod column;
pub mod config;
pub mod error;
pub mod extract;
pub mod filename;
pub mod grid;
pub mod header;
pub mod model;
pub mod reconcile;
pub mod report;
pub mod total;
pub mod verify;

pub use alias::AliasTable;
pub use config::AuditConfig;
pub use error::AuditError;
pub use extract::{extract_record, extract_sheet, ExtractContext};
pub use grid::{CellValue, SheetGrid};
pub use model::{
    CanonicalField, ExtractedRecord, MasterRecord, ReconciliationOutcome, ScannedFile,
    SheetExtraction, SheetRole, VerifyStatus,
};
pub use reconcile::reconcile;
pub use verify::{verify, VerifyOutcome};
