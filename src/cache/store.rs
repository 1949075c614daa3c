//! Cache store persisting the postcode cache to a single JSON file
//!
//! Provides a `CacheStore` that loads, merges and rewrites the whole cache
//! mapping. There is no locking: concurrent processes race and the last
//! `save` wins.

use directories::ProjectDirs;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::{Cache, CacheRecord};

/// File name of the cache inside the cache directory
pub const CACHE_FILE_NAME: &str = "postcode_cache.json";

/// Errors that can occur when reading or writing the cache file
#[derive(Debug, Error)]
pub enum CacheError {
    /// Existing cache content is not a valid cache mapping
    #[error("cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Existing cache file could not be read
    #[error("failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Cache file could not be written
    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads and writes the cache mapping on disk
///
/// The store holds no cache state of its own; every `load` reads the file
/// afresh and every `save` replaces it entirely.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Location of the cache file
    path: PathBuf,
}

impl CacheStore {
    /// Creates a CacheStore in the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/postcode-cli/postcode_cache.json` on Linux, or the
    /// equivalent path on other platforms. Returns `None` if the cache
    /// directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "postcode-cli")?;
        let path = project_dirs.cache_dir().join(CACHE_FILE_NAME);
        Some(Self { path })
    }

    /// Creates a CacheStore backed by a specific file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cache mapping from disk
    ///
    /// A missing file is initialized to an empty mapping before returning.
    ///
    /// # Returns
    /// * `Ok(Cache)` with the persisted contents
    /// * `Err(CacheError::Corrupt)` if the file exists but cannot be parsed
    /// * `Err(CacheError::Write)` if a missing file cannot be created
    pub fn load(&self) -> Result<Cache, CacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "cache file missing, initializing");
                let cache = Cache::new();
                self.save(&cache)?;
                return Ok(cache);
            }
            Err(source) => {
                return Err(CacheError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the persisted cache with `cache`
    ///
    /// Content is written to a sibling temp file and renamed into place, so
    /// readers see either the old or the new mapping, never a partial one.
    pub fn save(&self, cache: &Cache) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(cache)
            .map_err(|e| self.write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json).map_err(|e| self.write_error(e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| self.write_error(e))?;

        debug!(path = %self.path.display(), entries = cache.len(), "cache saved");
        Ok(())
    }

    /// Loads the cache, merges one record into it and saves it back
    pub fn update(&self, key: &str, record: CacheRecord) -> Result<Cache, CacheError> {
        let mut cache = self.load()?;
        cache.merge(key, record);
        self.save(&cache)?;
        Ok(cache)
    }

    fn write_error(&self, source: io::Error) -> CacheError {
        CacheError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
