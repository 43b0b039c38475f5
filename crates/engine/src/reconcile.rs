use std::collections::BTreeSet;

use crate::model::{ReconciliationOutcome, ScannedFile};

/// Partition scanned files against the master identifier set.
///
/// Files whose resolved identifier appears in the master go to `matched`;
/// files with an identifier the master does not know go to `rejected`;
/// files with no resolvable identifier at all go to `failed_parse`. With
/// an empty master set there is nothing to reconcile against, so every
/// parseable file is treated as matched (extraction-only runs).
///
/// `missing_from_master` is the complement: master identifiers no scanned
/// file accounted for.
pub fn reconcile(
    files: Vec<ScannedFile>,
    master_ids: &BTreeSet<String>,
) -> ReconciliationOutcome {
    let mut matched = Vec::new();
    let mut rejected = Vec::new();
    let mut failed_parse = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for file in files {
        match &file.identifier {
            None => failed_parse.push(file),
            Some(id) => {
                if master_ids.is_empty() || master_ids.contains(id) {
                    seen.insert(id.clone());
                    matched.push(file);
                } else {
                    rejected.push(file);
                }
            }
        }
    }

    let missing_from_master = master_ids.difference(&seen).cloned().collect();

    ReconciliationOutcome { matched, rejected, failed_parse, missing_from_master }
}
