//! Command-line argument parsing for AIHub Fetcher
//!
//! This module defines the CLI structure using clap derive macros,
//! providing a user-friendly interface for dataset discovery, downloading,
//! and API key management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::models::FileSelection;

/// AIHub Fetcher - browse and download AIHub datasets
#[derive(Parser, Debug)]
#[command(
    name = "aihub_fetcher",
    version,
    about = "Browse and download datasets from the AIHub open-data portal",
    long_about = "A tool for the AIHub open-data portal: validate an API key once, list the
available datasets, inspect a dataset's file tree, and download archives with
progress reporting. Downloaded archives are extracted and split files are
reassembled automatically."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the AIHub API key
    Auth(AuthArgs),

    /// List the datasets available on the portal
    List(ListArgs),

    /// Show the file tree of a dataset
    Files(FilesArgs),

    /// Download a dataset archive and reassemble its contents
    Download(DownloadArgs),
}

/// Arguments for API key management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// API key management actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Validate an API key against the portal and store it
    Login {
        /// Key value; prompted for interactively when omitted
        #[arg(long)]
        key: Option<String>,
    },

    /// Show authentication status
    Status {
        /// Also re-validate the key against the portal
        #[arg(long)]
        check: bool,
    },

    /// Remove the stored API key
    Logout,
}

/// Arguments for the dataset list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Also export the table as CSV to this path
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,
}

/// Arguments for the file tree command
#[derive(Args, Debug)]
pub struct FilesArgs {
    /// Dataset key, as shown by `list`
    pub dataset: String,
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Dataset key, as shown by `list`
    pub dataset: String,

    /// `all`, or a comma-separated list of file keys (see `files`)
    #[arg(short, long, default_value = "all")]
    pub files: String,

    /// Output directory; defaults to the configured directory, then "."
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Keep the tar archive after extraction
    #[arg(long)]
    pub keep_archive: bool,

    /// Download only; skip extraction and part reassembly
    #[arg(long)]
    pub skip_extract: bool,

    /// Overwrite an existing archive in the output directory
    #[arg(short = 'F', long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by flags, if any was given
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl DownloadArgs {
    /// Validate argument combinations before any network traffic
    pub fn validate(&self) -> Result<(), String> {
        if self.dataset.trim().is_empty() {
            return Err("Dataset key must not be empty".to_string());
        }

        if let FileSelection::Keys(keys) = self.selection() {
            if keys.is_empty() {
                return Err(
                    "File selection must be 'all' or a comma-separated list of keys".to_string(),
                );
            }
        }

        if self.skip_extract && self.keep_archive {
            return Err(
                "--keep-archive has no effect with --skip-extract; the archive is always kept"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// The parsed file selection
    pub fn selection(&self) -> FileSelection {
        FileSelection::parse(&self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download_args() -> DownloadArgs {
        DownloadArgs {
            dataset: "571".to_string(),
            files: "all".to_string(),
            output: None,
            keep_archive: false,
            skip_extract: false,
            force: false,
        }
    }

    #[test]
    fn test_download_args_validation() {
        assert!(download_args().validate().is_ok());

        // Empty dataset key
        let args = DownloadArgs {
            dataset: "  ".to_string(),
            ..download_args()
        };
        assert!(args.validate().is_err());

        // Selection that parses to no keys
        let args = DownloadArgs {
            files: ", ,".to_string(),
            ..download_args()
        };
        assert!(args.validate().is_err());

        // Redundant flag combination
        let args = DownloadArgs {
            keep_archive: true,
            skip_extract: true,
            ..download_args()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_selection_parsing() {
        let args = DownloadArgs {
            files: "69412,69413".to_string(),
            ..download_args()
        };
        assert_eq!(
            args.selection(),
            FileSelection::Keys(vec!["69412".to_string(), "69413".to_string()])
        );
        assert_eq!(download_args().selection(), FileSelection::All);
    }

    #[test]
    fn test_log_level() {
        let mut cli = Cli {
            global: GlobalArgs {
                verbose: false,
                very_verbose: false,
                quiet: false,
                config: None,
            },
            command: Commands::List(ListArgs { csv: None }),
        };
        assert_eq!(cli.log_level(), None);

        cli.global.verbose = true;
        assert_eq!(cli.log_level(), Some(tracing::Level::INFO));

        cli.global.quiet = true;
        assert_eq!(cli.log_level(), Some(tracing::Level::ERROR));
    }

    #[test]
    fn test_cli_parses_download() {
        let cli = Cli::try_parse_from([
            "aihub_fetcher",
            "download",
            "571",
            "--files",
            "69412",
            "--output",
            "/tmp/data",
        ])
        .unwrap();

        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.dataset, "571");
                assert_eq!(args.files, "69412");
                assert_eq!(args.output, Some(PathBuf::from("/tmp/data")));
            }
            other => panic!("expected download command, got {:?}", other),
        }
    }
}
