//! AIHub Fetcher CLI application
//!
//! Command-line interface for browsing and downloading AIHub datasets.
//! Handles API key management, listing, streaming downloads, and archive
//! reassembly.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use aihub_fetcher::cli::{handle_auth, handle_download, handle_files, handle_list, Cli, Commands};
use aihub_fetcher::config::AppConfig;
use aihub_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok(); // Ignore errors if file doesn't exist

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Configuration must load before logging so its default level applies
    let config = AppConfig::load_or_init(cli.global.config.as_deref())?;

    init_logging(&cli, &config);

    info!("AIHub Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let quiet = cli.global.quiet;

    // Execute the appropriate command
    match cli.command {
        Commands::Auth(args) => {
            info!("Executing auth command");
            handle_auth(args, &config).await
        }
        Commands::List(args) => {
            info!("Executing list command");
            handle_list(args, &config, quiet).await
        }
        Commands::Files(args) => {
            info!("Executing files command");
            handle_files(args, &config, quiet).await
        }
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, &config, quiet).await
        }
    }
}

/// Initialize logging from verbosity flags, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let log_level = cli
        .log_level()
        .map(|level| level.to_string())
        .unwrap_or_else(|| config.logging.default_level.clone());

    // Create environment filter
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("aihub_fetcher={}", log_level).parse().unwrap());

    // Initialize subscriber
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
