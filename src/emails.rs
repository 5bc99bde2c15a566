//! Email list handling for assignment checks.
//!
//! Task rows carry a free-text `emails` column holding a delimited list of
//! addresses. Membership is decided by a word-boundary match against the
//! lowercased column value, so `a@b.com` never matches inside `xa@b.com`.

use regex_lite::Regex;

/// Characters that may legally appear inside an address. Anything else (or
/// the start/end of the column value) terminates a match.
const BOUNDARY: &str = "[^a-z0-9.@_-]";

/// Split a comma-delimited query parameter into trimmed, lowercased,
/// non-empty addresses.
pub fn split_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Build the word-boundary membership pattern for one address.
pub fn membership_pattern(email: &str) -> Regex {
    let pattern = format!(
        "(^|{b}){e}({b}|$)",
        b = BOUNDARY,
        e = regex_lite::escape(&email.to_ascii_lowercase())
    );
    // The pattern is a fixed template around an escaped literal.
    Regex::new(&pattern).expect("escaped literal pattern")
}

/// Build matchers for a set of addresses.
pub fn membership_patterns(emails: &[String]) -> Vec<Regex> {
    emails.iter().map(|e| membership_pattern(e)).collect()
}

/// Whether the delimited list column matches any of the given patterns.
pub fn list_matches(list: &str, patterns: &[Regex]) -> bool {
    let haystack = list.to_ascii_lowercase();
    patterns.iter().any(|p| p.is_match(&haystack))
}
