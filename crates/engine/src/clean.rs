use std::sync::OnceLock;

use regex::Regex;

fn number_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").unwrap())
}

/// Clean a raw cell string into a numeric value.
///
/// Strips thousands separators and currency symbols, then takes the first
/// decimal-or-integer token. A cell holding only "-" or "." cleans to 0
/// (the accounting convention for "none"). `None` means the cell was
/// non-empty but unparseable — the caller records a VALUE_PARSE_ERROR
/// rather than defaulting to zero, which would mask data-quality faults.
pub fn clean_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "-" || trimmed == "." {
        return Some(0.0);
    }

    let stripped: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '€' | '£' | '¥'))
        .collect();

    let token = number_token().find(&stripped)?;
    token.as_str().parse::<f64>().ok()
}
