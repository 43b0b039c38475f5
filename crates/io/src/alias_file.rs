use std::fs;
use std::path::Path;

use shipcheck_engine::{AuditConfig, AuditError};

/// Default mapping-config file name looked for in the input folder.
pub const DEFAULT_CONFIG_NAME: &str = "shipcheck.toml";

/// Load the audit config.
///
/// An explicit path must exist and parse, full stop. Without one, the
/// input folder is probed for `shipcheck.toml`; a missing implicit
/// config falls back to the built-in defaults with a warning, since
/// plenty of folders audit fine on the legacy header heuristics alone.
/// A config that exists but fails to parse is always a hard error —
/// silently ignoring a typo'd mapping file would change results.
pub fn load_config(
    explicit: Option<&Path>,
    folder: &Path,
) -> Result<(AuditConfig, Vec<String>), AuditError> {
    let mut warnings = Vec::new();

    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(AuditError::FileNotFound { file: path.display().to_string() });
            }
            path.to_path_buf()
        }
        None => {
            let implicit = folder.join(DEFAULT_CONFIG_NAME);
            if !implicit.exists() {
                warnings.push(format!(
                    "no {DEFAULT_CONFIG_NAME} in folder; using built-in defaults"
                ));
                return Ok((AuditConfig::default(), warnings));
            }
            implicit
        }
    };

    let raw = fs::read_to_string(&path).map_err(|e| AuditError::FileUnreadable {
        file: path.display().to_string(),
        detail: e.to_string(),
    })?;
    let config = AuditConfig::from_toml(&raw)?;
    Ok((config, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_implicit_config_falls_back_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(None, dir.path()).unwrap();
        assert!(config.groups.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn implicit_config_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            "[[groups]]\nname = \"g\"\n[groups.mappings]\n\"qty\" = \"qty_area\"\n",
        )
        .unwrap();
        let (config, warnings) = load_config(None, dir.path()).unwrap();
        assert_eq!(config.groups.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn missing_explicit_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(Path::new("/nonexistent/map.toml")), dir.path()).unwrap_err();
        assert_eq!(err.code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn unparseable_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "groups = 7").unwrap();
        let err = load_config(Some(&path), dir.path()).unwrap_err();
        assert_eq!(err.code(), "CONFIG_PARSE");
    }
}
