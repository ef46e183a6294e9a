//! Loose phone number comparison for call-record lookups.
//!
//! # Invariants
//! - Formatting characters never affect equality.
//! - Numbers shorter than `MIN_MATCH_DIGITS` only match exactly.
//! - A country prefix of up to `MAX_COUNTRY_CODE_DIGITS` digits may be present
//!   on one side only.

use once_cell::sync::Lazy;
use regex::Regex;

const MIN_MATCH_DIGITS: usize = 7;
const MAX_COUNTRY_CODE_DIGITS: usize = 3;

static NON_DIALABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9+]").expect("valid non-dialable regex"));

/// Returns whether two phone numbers address the same line.
///
/// Rules:
/// - Everything except digits and `+` is ignored.
/// - A leading `00` is read as the international `+` prefix.
/// - A national number (no `+`) drops one leading trunk `0`.
/// - Equal digit strings match; otherwise, when both sides have at least
///   seven digits, the longer must end with the shorter and differ only by a
///   leading country code.
pub fn phone_numbers_equal(left: &str, right: &str) -> bool {
    let (Some(left), Some(right)) = (normalize(left), normalize(right)) else {
        return false;
    };

    if left == right {
        return true;
    }

    let (shorter, longer) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    if shorter.len() < MIN_MATCH_DIGITS {
        return false;
    }

    longer.ends_with(shorter.as_str())
        && longer.len() - shorter.len() <= MAX_COUNTRY_CODE_DIGITS
}

fn normalize(raw: &str) -> Option<String> {
    let dialable = NON_DIALABLE_RE.replace_all(raw.trim(), "");
    let (international, body) = if let Some(rest) = dialable.strip_prefix('+') {
        (true, rest)
    } else if let Some(rest) = dialable.strip_prefix("00") {
        (true, rest)
    } else {
        (false, &dialable[..])
    };

    if body.contains('+') {
        return None;
    }

    let digits = if international {
        body
    } else {
        body.strip_prefix('0').unwrap_or(body)
    };
    if digits.is_empty() {
        None
    } else {
        Some(digits.to_string())
    }
}
