use std::fmt;

use serde::Serialize;

use crate::model::CanonicalField;

/// Structured extraction/verification error. Every variant carries enough
/// context (file, sheet, offending column or value) to locate the source
/// cell without reading logs, plus a stable code via [`AuditError::code`].
///
/// Per-file and per-sheet errors are recorded on the owning record and do
/// not abort a batch; only folder-missing and explicit-master-missing are
/// treated as fatal by callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditError {
    FileNotFound { file: String },
    FileUnreadable { file: String, detail: String },
    FileLocked { file: String },
    SheetNotFound { file: String, role: String },
    HeaderNotFound { file: String, sheet: String },
    TotalRowNotFound { file: String, sheet: String },
    /// No recognizable headers anywhere in the sheet — almost certainly a
    /// wrong input document rather than a layout quirk.
    InvalidDocument { file: String, sheet: String, reason: String },
    ColumnNotFound { file: String, sheet: String, field: CanonicalField },
    ValueParseError { file: String, sheet: String, column: String, raw: String },
    ValidationError { file: String, sheet: String, detail: String },
    WriteFailed { file: String, detail: String },
    ConfigParse { detail: String },
    ConfigValidation { detail: String },
    /// Catch-all wrapper so nothing is swallowed silently.
    Unknown { file: String, detail: String },
}

impl AuditError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::FileUnreadable { .. } => "FILE_UNREADABLE",
            Self::FileLocked { .. } => "FILE_LOCKED",
            Self::SheetNotFound { .. } => "SHEET_NOT_FOUND",
            Self::HeaderNotFound { .. } => "HEADER_NOT_FOUND",
            Self::TotalRowNotFound { .. } => "TOTAL_ROW_NOT_FOUND",
            Self::InvalidDocument { .. } => "INVALID_DOCUMENT",
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::ValueParseError { .. } => "VALUE_PARSE_ERROR",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::WriteFailed { .. } => "WRITE_FAILED",
            Self::ConfigParse { .. } => "CONFIG_PARSE",
            Self::ConfigValidation { .. } => "CONFIG_VALIDATION",
            Self::Unknown { .. } => "UNKNOWN_ERROR",
        }
    }

    /// Fill in the file name on errors raised below the file level.
    /// Extraction runs per sheet and does not know the file name; the
    /// pipeline stamps it on before attaching errors to the record.
    pub fn with_file(mut self, name: &str) -> Self {
        let slot = match &mut self {
            Self::FileNotFound { file }
            | Self::FileUnreadable { file, .. }
            | Self::FileLocked { file }
            | Self::SheetNotFound { file, .. }
            | Self::HeaderNotFound { file, .. }
            | Self::TotalRowNotFound { file, .. }
            | Self::InvalidDocument { file, .. }
            | Self::ColumnNotFound { file, .. }
            | Self::ValueParseError { file, .. }
            | Self::ValidationError { file, .. }
            | Self::WriteFailed { file, .. }
            | Self::Unknown { file, .. } => file,
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => return self,
        };
        if slot.is_empty() {
            *slot = name.to_string();
        }
        self
    }
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.code())?;
        match self {
            Self::FileNotFound { file } => write!(f, "file not found: '{file}'"),
            Self::FileUnreadable { file, detail } => {
                write!(f, "cannot read '{file}': {detail}")
            }
            Self::FileLocked { file } => write!(f, "file is locked: '{file}'"),
            Self::SheetNotFound { file, role } => {
                write!(f, "no '{role}' sheet in '{file}'")
            }
            Self::HeaderNotFound { file, sheet } => {
                write!(f, "header row not found (need 3+ matches) in sheet '{sheet}' of '{file}'")
            }
            Self::TotalRowNotFound { file, sheet } => {
                write!(f, "no total row in sheet '{sheet}' of '{file}'")
            }
            Self::InvalidDocument { file, sheet, reason } => {
                write!(f, "sheet '{sheet}' of '{file}' has no recognizable headers: {reason}")
            }
            Self::ColumnNotFound { file, sheet, field } => {
                write!(f, "required field '{field}' missing or invalid in sheet '{sheet}' of '{file}'")
            }
            Self::ValueParseError { file, sheet, column, raw } => {
                write!(f, "cannot parse value '{raw}' in column {column}, sheet '{sheet}' of '{file}'")
            }
            Self::ValidationError { file, sheet, detail } => {
                write!(f, "validation failed in sheet '{sheet}' of '{file}': {detail}")
            }
            Self::WriteFailed { file, detail } => {
                write!(f, "cannot write '{file}': {detail}")
            }
            Self::ConfigParse { detail } => write!(f, "config parse error: {detail}"),
            Self::ConfigValidation { detail } => write!(f, "config validation error: {detail}"),
            Self::Unknown { file, detail } => write!(f, "unexpected error in '{file}': {detail}"),
        }
    }
}

impl std::error::Error for AuditError {}
