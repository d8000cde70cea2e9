//! Content-addressed result cache for agentlint.
//!
//! The store maps `(file path, content hash, effective-config hash)` to a
//! previously computed result. Any change to file content or effective
//! configuration changes the key, so stale entries are simply never looked
//! up again; there is no weaker invalidation mode and no partial reuse.
//!
//! The on-disk shape is a single JSON object owned by the engine. A missing,
//! unreadable, or corrupt store degrades to an empty cache — a cache problem
//! must never fail a lint run.

mod key;
mod store;

pub use key::{content_hash, CacheKey};
pub use store::CacheStore;
