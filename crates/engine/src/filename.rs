use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Leading letter-runs that are packaging noise, not document series
/// prefixes. "COPY OF ABC-2001.xlsx" must resolve to ABC-2001, not COPY.
const NOISE_PREFIXES: [&str; 8] = ["COPY", "XLS", "V", "PART", "REV", "VAL", "NUM", "NO"];

fn id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:[A-Z]+[-_])?[A-Z]+[-_]?\d+[A-Z]*").unwrap())
}

/// Resolve the document identifier carried in a file name.
///
/// Known master identifiers take precedence: the longest known id that
/// appears as a substring (case-insensitive) wins, so "ABC-2001-B" is
/// never shadowed by "ABC-2001". Only when no known id matches does the
/// pattern fallback run, keeping the noise-prefix filter and taking the
/// longest surviving candidate.
pub fn resolve_identifier(file_name: &str, known_ids: &BTreeSet<String>) -> Option<String> {
    let upper = file_name.to_uppercase();

    let mut ids: Vec<&String> = known_ids.iter().collect();
    // Longest first; lexicographic second keeps the order deterministic.
    ids.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    for id in ids {
        if !id.is_empty() && upper.contains(&id.to_uppercase()) {
            return Some(id.clone());
        }
    }

    let mut best: Option<String> = None;
    for m in id_pattern().find_iter(file_name) {
        let candidate = m.as_str().to_uppercase();
        if is_noise(&candidate) {
            continue;
        }
        match &best {
            Some(b) if candidate.len() <= b.len() => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// A candidate whose leading letter-run is a noise word ("REV2", "V3",
/// "PART1") is never an identifier.
fn is_noise(candidate: &str) -> bool {
    let letters: String = candidate.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    NOISE_PREFIXES.contains(&letters.as_str())
}
