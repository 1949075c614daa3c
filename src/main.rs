//! Postcode CLI - Validate and autocomplete UK postcodes
//!
//! Looks postcodes up on postcodes.io, keeping answers in a local cache so
//! repeated lookups do not hit the network.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use postcode_cli::cache::CacheStore;
use postcode_cli::cli::{format_completions, format_validity, Cli, Mode, RunConfig};
use postcode_cli::postcodes::{canonicalize, PostcodeClient};

/// Installs a stderr log subscriber, honouring `RUST_LOG` when set
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("postcode_cli={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Performs the requested lookup and returns the text to print
async fn run(config: RunConfig) -> Result<String, Box<dyn std::error::Error>> {
    let store = CacheStore::with_path(config.cache_file);
    let client = PostcodeClient::with_config(store, config.client)?;
    let postcode = canonicalize(&config.postcode);

    let output = match config.mode {
        Mode::Validate => {
            let valid = client.validate_postcode(&postcode).await?;
            format_validity(&postcode, valid)
        }
        Mode::Complete => {
            let completions = client.get_postcode_completions(&postcode).await?;
            format_completions(&postcode, completions.as_deref())
        }
    };

    Ok(output)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match RunConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
