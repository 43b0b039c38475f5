use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::AuditError;
use crate::model::CanonicalField;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Batch audit configuration: ordered alias groups, total-row blacklist,
/// and the verification tolerance. Constructed once per run and passed by
/// reference — no global state, so tests can inject their own tables.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub name: String,
    /// Alias groups in priority order; later groups win on key collision.
    #[serde(default)]
    pub groups: Vec<AliasGroup>,
    #[serde(default)]
    pub blacklist: BlacklistConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

/// One named header-text → canonical-field mapping table. Values
/// deserialize straight into [`CanonicalField`], so an unknown field id
/// fails at load time instead of at point of use.
#[derive(Debug, Clone, Deserialize)]
pub struct AliasGroup {
    pub name: String,
    #[serde(default)]
    pub mappings: BTreeMap<String, CanonicalField>,
}

// ---------------------------------------------------------------------------
// Blacklist + tolerance
// ---------------------------------------------------------------------------

/// Terms that disqualify a row from total-row detection. Product
/// descriptions in this domain routinely contain "total" ("total grain
/// buffalo leather"), so rows mentioning these materials are never
/// treated as aggregate rows.
#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistConfig {
    #[serde(default = "default_blacklist_terms")]
    pub terms: Vec<String>,
}

fn default_blacklist_terms() -> Vec<String> {
    ["buffalo", "cow", "leather"].map(String::from).to_vec()
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self { terms: default_blacklist_terms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    /// Absolute per-field tolerance; a diff passes iff |diff| <= amount.
    #[serde(default = "default_tolerance")]
    pub amount: f64,
}

fn default_tolerance() -> f64 {
    0.01
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self { amount: default_tolerance() }
    }
}

// ---------------------------------------------------------------------------
// Parse + validate
// ---------------------------------------------------------------------------

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            groups: Vec::new(),
            blacklist: BlacklistConfig::default(),
            tolerance: ToleranceConfig::default(),
        }
    }
}

impl AuditConfig {
    pub fn from_toml(input: &str) -> Result<Self, AuditError> {
        let mut config: AuditConfig = toml::from_str(input)
            .map_err(|e| AuditError::ConfigParse { detail: e.to_string() })?;
        // Total-row scanning compares against lowercased cell text, so the
        // terms must be lowercase no matter how the config spells them.
        for term in &mut config.blacklist.terms {
            *term = term.trim().to_lowercase();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AuditError> {
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(AuditError::ConfigValidation {
                    detail: "alias group with empty name".into(),
                });
            }
            for key in group.mappings.keys() {
                if key.trim().is_empty() {
                    return Err(AuditError::ConfigValidation {
                        detail: format!("group '{}': empty alias key", group.name),
                    });
                }
            }
        }

        if self.tolerance.amount < 0.0 {
            return Err(AuditError::ConfigValidation {
                detail: format!("tolerance must be >= 0, got {}", self.tolerance.amount),
            });
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "Trade Audit"

[[groups]]
name = "header_text"
[groups.mappings]
"quantity" = "qty_area"
"amount" = "amount"
"pallet no" = "pallet_count"

[[groups]]
name = "shipping_list"
[groups.mappings]
"pcs" = "qty_pieces"
"net weight" = "net_weight"

[blacklist]
terms = ["buffalo", "cow"]

[tolerance]
amount = 0.01
"#;

    #[test]
    fn parse_valid() {
        let config = AuditConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Trade Audit");
        assert_eq!(config.groups.len(), 2);
        assert_eq!(
            config.groups[0].mappings["quantity"],
            CanonicalField::QtyArea
        );
        assert_eq!(config.blacklist.terms, vec!["buffalo", "cow"]);
        assert_eq!(config.tolerance.amount, 0.01);
    }

    #[test]
    fn defaults_when_sections_absent() {
        let config = AuditConfig::from_toml("name = \"Minimal\"").unwrap();
        assert!(config.groups.is_empty());
        assert_eq!(config.blacklist.terms, vec!["buffalo", "cow", "leather"]);
        assert_eq!(config.tolerance.amount, 0.01);
    }

    #[test]
    fn blacklist_terms_are_lowercased() {
        let config =
            AuditConfig::from_toml("[blacklist]\nterms = [\"Buffalo\", \" COW \"]").unwrap();
        assert_eq!(config.blacklist.terms, vec!["buffalo", "cow"]);
    }

    #[test]
    fn reject_unknown_field_id() {
        let input = r#"
[[groups]]
name = "bad"
[groups.mappings]
"quantity" = "qty_sqmeters"
"#;
        let err = AuditConfig::from_toml(input).unwrap_err();
        assert_eq!(err.code(), "CONFIG_PARSE");
    }

    #[test]
    fn reject_empty_group_name() {
        let input = r#"
[[groups]]
name = ""
[groups.mappings]
"quantity" = "qty_area"
"#;
        let err = AuditConfig::from_toml(input).unwrap_err();
        assert_eq!(err.code(), "CONFIG_VALIDATION");
    }

    #[test]
    fn reject_negative_tolerance() {
        let err = AuditConfig::from_toml("[tolerance]\namount = -1.0").unwrap_err();
        assert!(err.to_string().contains("tolerance"));
    }
}
