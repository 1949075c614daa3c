//! postcodes.io client with a local lookup cache
//!
//! Validation and autocomplete results are cached per canonical postcode;
//! reverse geocoding and bulk lookups always go to the service.

mod client;

pub use client::{
    ClientConfig, PostcodeClient, PostcodeError, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
    MAX_BULK_POSTCODES,
};

/// Canonicalizes a postcode for use as a cache key and request path segment
///
/// Whitespace is dropped and letters are uppercased, so `" sw1a 1aa "`,
/// `"SW1A 1AA"` and `"SW1A1AA"` all map to `"SW1A1AA"`.
pub fn canonicalize(postcode: &str) -> String {
    postcode
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_trims_and_uppercases() {
        assert_eq!(canonicalize(" sw1a 1aa "), "SW1A1AA");
        assert_eq!(canonicalize("SW1A1AA"), "SW1A1AA");
        assert_eq!(canonicalize("\tec1a\n"), "EC1A");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let once = canonicalize("  m1 1ae");
        assert_eq!(canonicalize(&once), once);
    }

    #[test]
    fn test_canonicalize_blank_is_empty() {
        assert_eq!(canonicalize("   "), "");
        assert_eq!(canonicalize(""), "");
    }
}
