//! Cache module for storing postcode lookups on disk
//!
//! This module keeps a single JSON file mapping canonical postcodes to what
//! is known about them: validity, autocomplete results, or both. Entries
//! never expire; the file is rewritten in full on every update.

mod record;
mod store;

pub use record::{Cache, CacheRecord};
pub use store::{CacheError, CacheStore, CACHE_FILE_NAME};
