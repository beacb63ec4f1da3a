//! Cache key derivation
//!
//! Keys are derived from the logical request only, so two requests the caller
//! considers the same always land on the same entry.

/// Derives the search cache key by removing every space character.
///
/// Case, punctuation and other whitespace (tabs, newlines) are preserved, so
/// `"Breaking Bad"` and `"BreakingBad"` share a key while `"breaking bad"`
/// does not. An empty or all-space query yields the empty key, which is a
/// valid key like any other.
pub fn search_key(query: &str) -> String {
    query.replace(' ', "")
}

/// Derives the detail cache key: the decimal form of the identifier.
pub fn detail_key(id: i64) -> String {
    id.to_string()
}
