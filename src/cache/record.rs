//! Cached postcode records and the in-memory cache mapping

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What is known locally about a single canonical postcode
///
/// Either field may be absent: a record written by an autocomplete lookup
/// carries only `completions`, one written by a validation carries only `valid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Validity as reported by the service, `None` if never validated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    /// Autocomplete results, `None` if never completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completions: Option<Vec<String>>,
}

impl CacheRecord {
    /// Creates a record that only establishes validity
    pub fn with_validity(valid: bool) -> Self {
        Self {
            valid: Some(valid),
            completions: None,
        }
    }

    /// Creates a record that only establishes completions
    pub fn with_completions(completions: Vec<String>) -> Self {
        Self {
            valid: None,
            completions: Some(completions),
        }
    }

    /// Returns true if the record carries validity or completion data
    ///
    /// An empty completions list still counts: it records that the
    /// service was asked and answered with nothing.
    pub fn is_known(&self) -> bool {
        self.valid.is_some() || self.completions.is_some()
    }

    /// Overlays the fields present in `update`, keeping the rest
    pub fn merge(&mut self, update: CacheRecord) {
        if let Some(valid) = update.valid {
            self.valid = Some(valid);
        }
        if let Some(completions) = update.completions {
            self.completions = Some(completions);
        }
    }
}

/// Mapping from canonical postcode to its cached record
///
/// Serializes as a plain JSON object keyed by postcode. Keys are kept sorted
/// so repeated saves produce a stable file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cache {
    entries: BTreeMap<String, CacheRecord>,
}

impl Cache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the record for a canonical postcode
    pub fn get(&self, key: &str) -> Option<&CacheRecord> {
        self.entries.get(key)
    }

    /// Merges `update` into the record for `key`, creating it if needed
    ///
    /// Updates carrying no data are ignored so that a record with both
    /// fields unknown never reaches disk.
    pub fn merge(&mut self, key: &str, update: CacheRecord) {
        if !update.is_known() {
            return;
        }
        self.entries.entry(key.to_string()).or_default().merge(update);
    }

    /// Returns the number of cached postcodes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no postcode is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_known() {
        assert!(!CacheRecord::default().is_known());
        assert!(CacheRecord::with_validity(false).is_known());
        assert!(CacheRecord::with_completions(vec![]).is_known());
    }

    #[test]
    fn test_merge_validity_preserves_completions() {
        let mut cache = Cache::new();
        cache.merge(
            "SW1A",
            CacheRecord::with_completions(vec!["SW1A 0AA".to_string(), "SW1A 0AB".to_string()]),
        );
        cache.merge("SW1A", CacheRecord::with_validity(false));

        let record = cache.get("SW1A").unwrap();
        assert_eq!(record.valid, Some(false));
        assert_eq!(
            record.completions.as_deref(),
            Some(&["SW1A 0AA".to_string(), "SW1A 0AB".to_string()][..])
        );
    }

    #[test]
    fn test_merge_completions_preserves_validity() {
        let mut cache = Cache::new();
        cache.merge("SW1A1AA", CacheRecord::with_validity(true));
        cache.merge("SW1A1AA", CacheRecord::with_completions(vec!["SW1A 1AA".to_string()]));

        let record = cache.get("SW1A1AA").unwrap();
        assert_eq!(record.valid, Some(true));
        assert_eq!(record.completions, Some(vec!["SW1A 1AA".to_string()]));
    }

    #[test]
    fn test_merge_overwrites_present_fields() {
        let mut cache = Cache::new();
        cache.merge("EC1A", CacheRecord::with_validity(false));
        cache.merge("EC1A", CacheRecord::with_validity(true));

        assert_eq!(cache.get("EC1A").unwrap().valid, Some(true));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_merge_ignores_unknown_record() {
        let mut cache = Cache::new();
        cache.merge("N1", CacheRecord::default());

        assert!(cache.is_empty());
        assert!(cache.get("N1").is_none());
    }

    #[test]
    fn test_absent_fields_are_omitted_from_json() {
        let mut cache = Cache::new();
        cache.merge("SW1A1AA", CacheRecord::with_validity(true));

        let json = serde_json::to_string(&cache).unwrap();
        assert_eq!(json, r#"{"SW1A1AA":{"valid":true}}"#);
    }

    #[test]
    fn test_null_fields_read_as_absent() {
        let cache: Cache =
            serde_json::from_str(r#"{"M1": {"valid": null, "completions": ["M1 1AA"]}}"#).unwrap();

        let record = cache.get("M1").unwrap();
        assert_eq!(record.valid, None);
        assert_eq!(record.completions, Some(vec!["M1 1AA".to_string()]));
    }
}
