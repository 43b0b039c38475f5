//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract — batch scripts branch on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success, everything verified                   |
//! | 1    | General error (unreadable folder, IO failure)  |
//! | 2    | Usage error (bad args, missing file)           |
//! | 10   | Audit ran but at least one record mismatched   |
//! | 11   | Mapping config invalid                         |

/// Success - command completed and all verifications passed.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required files.
pub const EXIT_USAGE: u8 = 2;

/// The audit completed but found verification mismatches.
/// Like `diff(1)`, a nonzero code here means "the data differs."
pub const EXIT_MISMATCH: u8 = 10;

/// Mapping config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 11;
