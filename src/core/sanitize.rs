//! MATCH-query sanitization for the inverted text index.
//!
//! FTS5 treats hyphens and brackets as control syntax (negation, column
//! filters). Tokens carrying them are wrapped in quotes so they rank as
//! literal phrases. Pure string-to-string, no storage dependency.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BRACKET_RE: Regex = Regex::new(r"[\[\]\(\)\{\}]").unwrap();
}

/// Sanitize a user query for the text index.
///
/// Any whitespace-separated token containing a hyphen past its first
/// character, or a bracket character anywhere, is wrapped in double quotes
/// (embedded quotes doubled). All other tokens pass through unchanged.
pub fn sanitize_match_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(sanitize_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn sanitize_token(token: &str) -> String {
    if needs_quoting(token) {
        format!("\"{}\"", token.replace('"', "\"\""))
    } else {
        token.to_string()
    }
}

fn needs_quoting(token: &str) -> bool {
    if BRACKET_RE.is_match(token) {
        return true;
    }
    token
        .chars()
        .enumerate()
        .any(|(position, c)| c == '-' && position > 0)
}
