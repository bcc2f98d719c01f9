use std::sync::LazyLock;

use regex::Regex;

/// Alternation of every month spelling the pages use, longest forms nested so
/// `Sept` and `September` both match whole.
pub const MONTH_PATTERN: &str = r"Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?";

/// A whole-word month token anywhere in the text, case-insensitive.
pub static MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b(?:{MONTH_PATTERN})\b")).unwrap());

/// Map a month name or abbreviation to 1..=12.
pub fn month_number(token: &str) -> Option<u32> {
    let normalized = token.trim().trim_end_matches('.').to_ascii_lowercase();
    match normalized.as_str() {
        "jan" | "january" => Some(1),
        "feb" | "february" => Some(2),
        "mar" | "march" => Some(3),
        "apr" | "april" => Some(4),
        "may" => Some(5),
        "jun" | "june" => Some(6),
        "jul" | "july" => Some(7),
        "aug" | "august" => Some(8),
        "sep" | "sept" | "september" => Some(9),
        "oct" | "october" => Some(10),
        "nov" | "november" => Some(11),
        "dec" | "december" => Some(12),
        _ => None,
    }
}

/// First month token in `text`, as written.
pub fn find_month(text: &str) -> Option<&str> {
    MONTH_RE.find(text).map(|m| m.as_str())
}
