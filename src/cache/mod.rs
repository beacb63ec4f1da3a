//! Cache module for storing upstream responses to disk
//!
//! Each namespace (search results, detail records) has its own in-memory table
//! backed by one JSON file. Tables are loaded once at startup, written back in
//! full after every insert, and never expire.

mod key;
mod namespace;
mod store;
mod table;

pub use key::{detail_key, search_key};
pub use namespace::Namespace;
pub use store::{CacheStore, CacheTable, Payload, PersistLock, StoreError};
pub use table::{LoadPolicy, NamespaceCache};
