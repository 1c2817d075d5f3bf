//! Command-line interface components
//!
//! This module contains CLI-specific code for the AIHub Fetcher application,
//! including argument parsing, progress display, and command handlers.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    AuthAction, AuthArgs, Cli, Commands, DownloadArgs, FilesArgs, GlobalArgs, ListArgs,
};
pub use commands::{handle_auth, handle_download, handle_files, handle_list};
pub use progress::{clear_spinner, interactive, listing_spinner, DownloadProgress};
