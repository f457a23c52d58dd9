//! Whitespace canonicalization for solution matching.
//!
//! Submitted code and stored solutions are compared in canonical form, so
//! indentation style and trailing newlines never decide whether a room is
//! solved. The comparison is otherwise exact and case-sensitive.

/// Space, tab, newline, and carriage return. Other Unicode whitespace such
/// as NBSP is ordinary text.
fn is_code_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Collapse every run of whitespace to a single space and trim both ends.
#[must_use]
pub fn canonicalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split(is_code_whitespace).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// True when `code` is solution-equivalent to an already canonical solution.
#[must_use]
pub fn matches_solution(code: &str, canonical_solution: &str) -> bool {
    canonicalize(code) == canonical_solution
}

#[cfg(test)]
#[path = "canonical_test.rs"]
mod tests;
