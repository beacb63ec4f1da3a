//! Cache namespaces and the files backing them

use std::fmt;

/// One of the independent cache domains.
///
/// Each namespace has its own file in the cache directory; keys are never
/// shared between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// TV search results, keyed by normalized query
    Search,
    /// TV detail records, keyed by numeric id
    Details,
}

impl Namespace {
    /// File name of this namespace inside the cache directory
    pub fn file_name(self) -> &'static str {
        match self {
            Namespace::Search => "search_cache.json",
            Namespace::Details => "details_cache.json",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Search => "search",
            Namespace::Details => "details",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
