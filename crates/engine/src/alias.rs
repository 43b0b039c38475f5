use std::collections::HashMap;

use crate::config::AuditConfig;
use crate::model::CanonicalField;

/// Flat normalized header-text → canonical-field table, merged from the
/// config's alias groups. Later groups silently override earlier ones on
/// key collision — mapping files are layered, not reconciled.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    map: HashMap<String, CanonicalField>,
}

impl AliasTable {
    pub fn from_config(config: &AuditConfig) -> Self {
        let mut map = HashMap::new();
        for group in &config.groups {
            for (key, field) in &group.mappings {
                map.insert(normalize(key), *field);
            }
        }
        Self { map }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Look up raw header text. The text is normalized before lookup, so
    /// "Net\nWeight ", "NET WEIGHT" and "net weight" all hit the same key.
    pub fn resolve(&self, text: &str) -> Option<CanonicalField> {
        self.map.get(&normalize(text)).copied()
    }

    /// Lookup with the legacy amount heuristics layered behind it. Old
    /// documents predate the mapping config and label the amount column
    /// freely ("TOTAL VALUE USD", "Amount in US$"); those still resolve
    /// even with an empty table.
    pub fn resolve_with_fallback(&self, text: &str) -> Option<CanonicalField> {
        let norm = normalize(text);
        if let Some(field) = self.map.get(&norm) {
            return Some(*field);
        }
        legacy_resolve(&norm)
    }
}

/// Lowercase, trim, and collapse all internal whitespace (including
/// newlines from wrapped header cells) to single spaces.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fallback resolution for pre-config documents: "total" + "value"
/// together, or "amount" anywhere, means the amount column.
pub(crate) fn legacy_resolve(normalized: &str) -> Option<CanonicalField> {
    if normalized.contains("total") && normalized.contains("value") {
        return Some(CanonicalField::Amount);
    }
    if normalized.contains("amount") {
        return Some(CanonicalField::Amount);
    }
    None
}
