//! Per-state input validators.
//!
//! All pure: a `None` means "re-prompt the same state", never an error.
//! Accepted values come back normalized (lowercased email, uppercased PAN,
//! digits-only phone).

use std::sync::LazyLock;

use regex::Regex;

use crate::identity::normalize_digits;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap()
});

static PAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());

/// Full name: at least two whitespace-separated tokens.
pub fn parse_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.split_whitespace().count() >= 2 {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// Email address in `local@domain.tld` shape, lowercased.
pub fn parse_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if EMAIL_RE.is_match(trimmed) {
        Some(trimmed.to_lowercase())
    } else {
        None
    }
}

/// Phone number: exactly 10 digits after stripping everything else.
pub fn parse_phone(raw: &str) -> Option<String> {
    let digits = normalize_digits(raw);
    if digits.len() == 10 { Some(digits) } else { None }
}

/// PAN: 5 letters, 4 digits, 1 letter, normalized to uppercase.
pub fn parse_pan(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    if PAN_RE.is_match(&upper) { Some(upper) } else { None }
}

/// Positive integer extracted by stripping all non-digit characters.
pub fn parse_amount(raw: &str) -> Option<u64> {
    let digits = normalize_digits(raw);
    match digits.parse::<u64>() {
        Ok(n) if n > 0 => Some(n),
        _ => None,
    }
}

/// A tenure from the fixed candidate set.
pub fn parse_tenure(raw: &str, candidates: &[u32]) -> Option<u32> {
    let digits = normalize_digits(raw);
    let months: u32 = digits.parse().ok()?;
    candidates.contains(&months).then_some(months)
}
