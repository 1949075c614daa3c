//! postcodes.io API client
//!
//! Wraps the validate, autocomplete, reverse geocode and bulk lookup
//! endpoints, consulting the on-disk cache for the first two.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::canonicalize;
use crate::cache::{CacheError, CacheRecord, CacheStore};

/// Base URL for the postcodes.io API
pub const DEFAULT_BASE_URL: &str = "https://api.postcodes.io";

/// Upper bound on a single remote call, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Largest list the bulk lookup endpoint accepts
pub const MAX_BULK_POSTCODES: usize = 100;

/// User agent sent with every request
const USER_AGENT_VALUE: &str = concat!("postcode-cli/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur when looking up postcodes
#[derive(Debug, Error)]
pub enum PostcodeError {
    /// Caller passed an argument the service cannot be asked about
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Service reported a server-side failure
    #[error("postcode service unavailable (HTTP {status})")]
    ServiceUnavailable { status: u16 },

    /// Service answered, but had nothing for the query
    #[error("no postcode found: {0}")]
    NoMatch(String),

    /// Remote call exceeded its time bound
    #[error("request to postcode service timed out")]
    Timeout,

    /// Service answered with a status this client does not handle
    #[error("unexpected response from postcode service (HTTP {status})")]
    UnexpectedResponse { status: u16 },

    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("failed to parse API response: {0}")]
    InvalidResponse(String),

    /// Local cache could not be read or written
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl PostcodeError {
    /// Whether the caller may reasonably retry the same call later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. } | Self::Timeout)
    }
}

impl From<reqwest::Error> for PostcodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::RequestFailed(e)
        }
    }
}

/// Connection settings for the postcode service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service root, without trailing slash
    pub base_url: String,
    /// Bound on each remote call
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Points the client at a different service root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the bound on each remote call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Envelope shared by every postcodes.io response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: Option<T>,
}

/// A single reverse geocode match; other fields are ignored
#[derive(Debug, Deserialize)]
struct LocationMatch {
    postcode: String,
}

/// Body of a bulk lookup request
#[derive(Debug, Serialize)]
struct BulkLookupRequest<'a> {
    postcodes: &'a [String],
}

/// Client for postcodes.io, backed by a local cache
#[derive(Debug, Clone)]
pub struct PostcodeClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Store for validation and autocomplete results
    cache: CacheStore,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl PostcodeClient {
    /// Creates a client against postcodes.io with the default timeout
    pub fn new(cache: CacheStore) -> Result<Self, PostcodeError> {
        Self::with_config(cache, ClientConfig::default())
    }

    /// Creates a client with custom connection settings
    pub fn with_config(cache: CacheStore, config: ClientConfig) -> Result<Self, PostcodeError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(PostcodeError::RequestFailed)?;

        Ok(Self {
            http_client,
            cache,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the store backing this client
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Returns whether a postcode is valid
    ///
    /// # Behavior
    /// - A cached validity is returned without a network call
    /// - Otherwise the service is asked and its answer cached, keeping any
    ///   completions already stored for the postcode
    pub async fn validate_postcode(&self, postcode: &str) -> Result<bool, PostcodeError> {
        let key = canonical_key(postcode)?;

        let cache = self.cache.load()?;
        if let Some(valid) = cache.get(&key).and_then(|record| record.valid) {
            debug!(postcode = %key, "validity cache hit");
            return Ok(valid);
        }
        debug!(postcode = %key, "validity cache miss");

        let url = format!("{}/postcodes/{}/validate", self.base_url, encode(&key));
        let valid = self
            .fetch_result::<bool>(self.http_client.get(&url), false)
            .await?
            .ok_or_else(|| {
                PostcodeError::InvalidResponse("validate result was null".to_string())
            })?;

        self.cache.update(&key, CacheRecord::with_validity(valid))?;
        Ok(valid)
    }

    /// Returns postcodes starting with `postcode_start`
    ///
    /// # Returns
    /// * `Ok(Some(list))` - Completions, possibly empty when read from cache
    /// * `Ok(None)` - The service has no matches (not cached)
    ///
    /// Any cached completions list is a hit, including an empty one.
    pub async fn get_postcode_completions(
        &self,
        postcode_start: &str,
    ) -> Result<Option<Vec<String>>, PostcodeError> {
        let key = canonical_key(postcode_start)?;

        let cache = self.cache.load()?;
        if let Some(completions) = cache.get(&key).and_then(|record| record.completions.clone()) {
            debug!(postcode = %key, count = completions.len(), "completions cache hit");
            return Ok(Some(completions));
        }
        debug!(postcode = %key, "completions cache miss");

        let url = format!("{}/postcodes/{}/autocomplete", self.base_url, encode(&key));
        let completions = match self
            .fetch_result::<Vec<String>>(self.http_client.get(&url), true)
            .await?
        {
            Some(completions) => completions,
            None => {
                debug!(postcode = %key, "no completions");
                return Ok(None);
            }
        };

        self.cache
            .update(&key, CacheRecord::with_completions(completions.clone()))?;
        Ok(Some(completions))
    }

    /// Returns the postcode nearest to a coordinate
    ///
    /// Never cached. Fails with `NoMatch` when nothing is near enough.
    pub async fn get_postcode_for_location(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<String, PostcodeError> {
        validate_coordinates(lat, lon)?;

        let url = format!("{}/postcodes", self.base_url);
        let request = self.http_client.get(&url).query(&[
            ("lon", lon.to_string()),
            ("lat", lat.to_string()),
            ("limit", "1".to_string()),
        ]);

        self.fetch_result::<Vec<LocationMatch>>(request, true)
            .await?
            .and_then(|matches| matches.into_iter().next())
            .map(|m| m.postcode)
            .ok_or_else(|| PostcodeError::NoMatch(format!("near lat={}, lon={}", lat, lon)))
    }

    /// Looks up full details for several postcodes in one request
    ///
    /// Never cached. Returns the service response untouched for the caller
    /// to interpret; per-postcode misses appear as `null` results inside it.
    pub async fn get_postcodes_details<S: AsRef<str>>(
        &self,
        postcodes: &[S],
    ) -> Result<serde_json::Value, PostcodeError> {
        if postcodes.is_empty() {
            return Err(PostcodeError::InvalidArgument(
                "at least one postcode is required".to_string(),
            ));
        }
        if postcodes.len() > MAX_BULK_POSTCODES {
            return Err(PostcodeError::InvalidArgument(format!(
                "at most {} postcodes per lookup, got {}",
                MAX_BULK_POSTCODES,
                postcodes.len()
            )));
        }
        let keys = postcodes
            .iter()
            .map(|p| canonical_key(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let url = format!("{}/postcodes", self.base_url);
        debug!(count = keys.len(), "bulk postcode lookup");
        let request = self
            .http_client
            .post(&url)
            .json(&BulkLookupRequest { postcodes: &keys });

        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Sends a request and decodes the `result` field of the response
    ///
    /// Returns `Ok(None)` when the service reports an empty result: a
    /// `null` result, or a 404 on endpoints where `not_found_is_empty` is set.
    async fn fetch_result<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        not_found_is_empty: bool,
    ) -> Result<Option<T>, PostcodeError> {
        let response = match self.send(request).await {
            Ok(response) => response,
            Err(PostcodeError::UnexpectedResponse { status })
                if not_found_is_empty && status == StatusCode::NOT_FOUND.as_u16() =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let body: ApiResponse<T> = response.json().await?;
        Ok(body.result)
    }

    /// Sends a request and sorts the response status into outcome classes
    ///
    /// Success yields the response; 5xx is `ServiceUnavailable` and any
    /// other status is `UnexpectedResponse`.
    async fn send(&self, request: RequestBuilder) -> Result<Response, PostcodeError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "postcode service responded");

        if status.is_success() {
            Ok(response)
        } else if status.is_server_error() {
            Err(PostcodeError::ServiceUnavailable {
                status: status.as_u16(),
            })
        } else {
            Err(PostcodeError::UnexpectedResponse {
                status: status.as_u16(),
            })
        }
    }
}

/// Canonicalizes a postcode, rejecting input that is blank
fn canonical_key(postcode: &str) -> Result<String, PostcodeError> {
    let key = canonicalize(postcode);
    if key.is_empty() {
        return Err(PostcodeError::InvalidArgument(
            "postcode must not be empty".to_string(),
        ));
    }
    Ok(key)
}

/// Checks that a coordinate pair is a real point on the globe
fn validate_coordinates(lat: f64, lon: f64) -> Result<(), PostcodeError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(PostcodeError::InvalidArgument(format!(
            "latitude must be between -90 and 90, got {}",
            lat
        )));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(PostcodeError::InvalidArgument(format!(
            "longitude must be between -180 and 180, got {}",
            lon
        )));
    }
    Ok(())
}

/// Percent-encodes a path segment
fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
