use std::fs;
use std::path::Path;

use shipcheck_engine::{AuditError, ScannedFile};

/// Workbook extensions the scanner picks up.
const WORKBOOK_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "xlsm"];

/// Scan a folder for candidate shipment workbooks.
///
/// Skipped: the master file itself (anything with "master" in the name),
/// editor lock files ("~$..."), and hidden files. Results come back
/// sorted by file name so batch order is stable across runs and
/// platforms. Identifier resolution happens later, against the loaded
/// master's known ids.
pub fn scan_folder(folder: &Path) -> Result<Vec<ScannedFile>, AuditError> {
    if !folder.is_dir() {
        return Err(AuditError::FileNotFound { file: folder.display().to_string() });
    }

    let entries = fs::read_dir(folder).map_err(|e| AuditError::FileUnreadable {
        file: folder.display().to_string(),
        detail: e.to_string(),
    })?;

    let mut files: Vec<ScannedFile> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_candidate(path))
        .map(ScannedFile::new)
        .collect();

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

fn is_candidate(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.starts_with("~$") || name.starts_with('.') || name.contains("master") {
        return false;
    }
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_only_candidate_workbooks() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "JLF-26002.xlsx",
            "ABC-101.xls",
            "Shipment Master.xlsx",
            "~$JLF-26002.xlsx",
            ".hidden.xlsx",
            "notes.txt",
            "rejection_report.csv",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("reports")).unwrap();

        let files = scan_folder(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["ABC-101.xls", "JLF-26002.xlsx"]);
    }

    #[test]
    fn missing_folder_is_a_structured_error() {
        let err = scan_folder(Path::new("/nonexistent/inbox")).unwrap_err();
        assert_eq!(err.code(), "FILE_NOT_FOUND");
    }
}
