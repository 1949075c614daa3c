//! Command-line interface parsing for Postcode CLI
//!
//! This module handles parsing of CLI arguments using clap and turns the
//! parsed flags into the settings the postcode client runs with. It also
//! renders lookup results for the terminal.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheStore;
use crate::postcodes::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Maximum number of completions printed for one lookup
pub const MAX_DISPLAYED_COMPLETIONS: usize = 5;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The request timeout must be positive
    #[error("Invalid timeout: {0}. Timeout must be at least 1 second")]
    InvalidTimeout(u64),

    /// No cache location was given and none could be derived
    #[error("Could not determine a cache directory; pass --cache-file")]
    NoCacheDir,
}

/// What to do with the postcode argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Check whether the postcode exists
    Validate,
    /// List postcodes starting with the given text
    Complete,
}

/// Postcode CLI - Validate and autocomplete UK postcodes
#[derive(Parser, Debug)]
#[command(name = "postcode")]
#[command(about = "Validate and autocomplete UK postcodes using postcodes.io")]
#[command(version)]
pub struct Cli {
    /// Lookup to perform
    #[arg(short, long, value_enum)]
    pub mode: Mode,

    /// Postcode (or the start of one, in complete mode)
    pub postcode: String,

    /// Cache file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Root URL of the postcode service
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Seconds to wait for each request before giving up
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Log cache and network activity to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Settings derived from CLI arguments for a single run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub postcode: String,
    pub cache_file: PathBuf,
    pub client: ClientConfig,
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(RunConfig)` with appropriate settings
    /// * `Err(CliError)` if the timeout is zero or no cache location exists
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.timeout == 0 {
            return Err(CliError::InvalidTimeout(cli.timeout));
        }

        let cache_file = match &cli.cache_file {
            Some(path) => path.clone(),
            None => CacheStore::new()
                .ok_or(CliError::NoCacheDir)?
                .path()
                .to_path_buf(),
        };

        Ok(RunConfig {
            mode: cli.mode,
            postcode: cli.postcode.clone(),
            cache_file,
            client: ClientConfig::default()
                .with_base_url(cli.base_url.clone())
                .with_timeout(Duration::from_secs(cli.timeout)),
        })
    }
}

/// Renders the result of a validate lookup
pub fn format_validity(postcode: &str, valid: bool) -> String {
    if valid {
        format!("{} is a valid postcode.", postcode)
    } else {
        format!("{} is not a valid postcode.", postcode)
    }
}

/// Renders the result of a complete lookup, one postcode per line
///
/// `None` is the service's "no matches" answer; an empty cached list reads
/// the same way to the user.
pub fn format_completions(postcode: &str, completions: Option<&[String]>) -> String {
    match completions {
        Some(list) if !list.is_empty() => list
            .iter()
            .take(MAX_DISPLAYED_COMPLETIONS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        _ => format!("No matches found for {}.", postcode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_validate() {
        let cli = Cli::parse_from(["postcode", "--mode", "validate", "SW1A1AA"]);
        assert_eq!(cli.mode, Mode::Validate);
        assert_eq!(cli.postcode, "SW1A1AA");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_complete_short_flag() {
        let cli = Cli::parse_from(["postcode", "-m", "complete", "sw1a"]);
        assert_eq!(cli.mode, Mode::Complete);
        assert_eq!(cli.postcode, "sw1a");
    }

    #[test]
    fn test_cli_mode_is_required() {
        let result = Cli::try_parse_from(["postcode", "SW1A1AA"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        let result = Cli::try_parse_from(["postcode", "-m", "locate", "SW1A1AA"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["postcode", "-m", "validate", "SW1A1AA"]);
        assert_eq!(cli.base_url, DEFAULT_BASE_URL);
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert!(cli.cache_file.is_none());
    }

    #[test]
    fn test_run_config_from_cli() {
        let cli = Cli::parse_from([
            "postcode",
            "-m",
            "complete",
            "EC1",
            "--cache-file",
            "/tmp/postcodes.json",
            "--base-url",
            "http://localhost:8080",
            "--timeout",
            "5",
        ]);

        let config = RunConfig::from_cli(&cli).unwrap();

        assert_eq!(config.mode, Mode::Complete);
        assert_eq!(config.postcode, "EC1");
        assert_eq!(config.cache_file, PathBuf::from("/tmp/postcodes.json"));
        assert_eq!(config.client.base_url, "http://localhost:8080");
        assert_eq!(config.client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_run_config_rejects_zero_timeout() {
        let cli = Cli::parse_from([
            "postcode",
            "-m",
            "validate",
            "SW1A1AA",
            "--cache-file",
            "cache.json",
            "--timeout",
            "0",
        ]);

        let result = RunConfig::from_cli(&cli);

        assert!(matches!(result, Err(CliError::InvalidTimeout(0))));
    }

    #[test]
    fn test_format_validity() {
        assert_eq!(format_validity("SW1A1AA", true), "SW1A1AA is a valid postcode.");
        assert_eq!(format_validity("XX1", false), "XX1 is not a valid postcode.");
    }

    #[test]
    fn test_format_completions_caps_at_five() {
        let list: Vec<String> = (1..=8).map(|i| format!("SW1A {}AA", i)).collect();

        let output = format_completions("SW1A", Some(list.as_slice()));

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), MAX_DISPLAYED_COMPLETIONS);
        assert_eq!(lines[0], "SW1A 1AA");
        assert_eq!(lines[4], "SW1A 5AA");
    }

    #[test]
    fn test_format_completions_no_matches() {
        assert_eq!(
            format_completions("ZZ", None),
            "No matches found for ZZ."
        );
        assert_eq!(
            format_completions("ZZ", Some(&[][..])),
            "No matches found for ZZ."
        );
    }
}
