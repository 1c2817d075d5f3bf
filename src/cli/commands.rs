//! Command handlers for AIHub Fetcher CLI
//!
//! This module implements the main command handlers that coordinate between
//! CLI arguments and the core application functionality.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::app::listing::FileTree;
use crate::app::models::{format_bytes, DatasetEntry, FileEntry, FileSelection};
use crate::app::{archive, AihubClient};
use crate::auth::{
    is_valid_key, prompt_api_key, resolve_api_key, ApiKeySource, AuthStatus, CredentialStore,
    StoredCredential,
};
use crate::cli::progress::{clear_spinner, interactive, listing_spinner, DownloadProgress};
use crate::cli::{AuthAction, AuthArgs, DownloadArgs, FilesArgs, ListArgs};
use crate::config::AppConfig;
use crate::constants::files;
use crate::errors::{ApiError, AppError, AuthError, Result};

/// Handle the auth command
pub async fn handle_auth(args: AuthArgs, config: &AppConfig) -> Result<()> {
    let store = CredentialStore::default_location()?;

    match args.action {
        AuthAction::Login { key } => login(key, &store, config).await,
        AuthAction::Status { check } => show_status(check, &store, config).await,
        AuthAction::Logout => {
            if store.clear()? {
                println!("Removed stored API key from {}", store.path().display());
            } else {
                println!("No stored API key to remove");
            }
            Ok(())
        }
    }
}

/// Validate a key against the portal and persist it on success
async fn login(key: Option<String>, store: &CredentialStore, config: &AppConfig) -> Result<()> {
    let key = match key {
        Some(key) => key.trim().to_string(),
        None => prompt_api_key()?,
    };
    if !is_valid_key(&key) {
        return Err(AuthError::InvalidKey {
            reason: "key must be non-empty printable ASCII".to_string(),
        }
        .into());
    }

    let client = AihubClient::with_config(config.client_config(), Some(&key))?;

    println!("Validating API key with AIHub...");
    client.validate_key().await?;

    store.save(&StoredCredential {
        api_key: key,
        validated_at: Some(Utc::now()),
    })?;
    println!("API key validated and saved to {}", store.path().display());
    Ok(())
}

/// Report authentication status, optionally re-validating the key
async fn show_status(check: bool, store: &CredentialStore, config: &AppConfig) -> Result<()> {
    let mut status = AuthStatus::gather(store)?;

    if let Some(source) = &status.source {
        println!("API key source: {}", source.describe());
        if let ApiKeySource::Stored(credential) = source {
            match credential.validated_at {
                Some(at) => println!("Last validated: {}", at.to_rfc3339()),
                None => println!("Last validated: never"),
            }
        }

        if check {
            println!("Checking key against the portal...");
            let client = AihubClient::with_config(config.client_config(), Some(source.key()))?;
            match client.validate_key().await {
                Ok(()) => {
                    status.key_valid = Some(true);
                    // Refresh the stored validation timestamp
                    if let ApiKeySource::Stored(credential) = source {
                        store.save(&StoredCredential {
                            api_key: credential.api_key.clone(),
                            validated_at: Some(Utc::now()),
                        })?;
                    }
                }
                Err(AuthError::KeyRejected) => status.key_valid = Some(false),
                Err(e) => return Err(e.into()),
            }
        }
    } else {
        println!("Credential file: {}", store.path().display());
    }

    println!("Status: {}", status.status_message());
    Ok(())
}

/// Handle the dataset list command
pub async fn handle_list(args: ListArgs, config: &AppConfig, quiet: bool) -> Result<()> {
    let client = AihubClient::with_config(config.client_config(), None)?;

    let spinner = listing_spinner(interactive(quiet), "Fetching dataset list...");
    let listing = client.fetch_dataset_list().await;
    clear_spinner(spinner);
    let listing = listing?;

    print_notice(listing.notice.as_deref());

    let datasets = listing.value;
    info!("Fetched {} datasets", datasets.len());
    print_dataset_table(&datasets);
    println!("{} datasets", datasets.len());

    if let Some(csv_path) = &args.csv {
        export_dataset_csv(&datasets, csv_path)?;
        println!("Dataset list exported to {}", csv_path.display());
    }

    Ok(())
}

/// Handle the file tree command
pub async fn handle_files(args: FilesArgs, config: &AppConfig, quiet: bool) -> Result<()> {
    let client = AihubClient::with_config(config.client_config(), None)?;

    let spinner = listing_spinner(
        interactive(quiet),
        &format!("Fetching file tree for dataset {}...", args.dataset),
    );
    let listing = client.fetch_file_tree(&args.dataset).await;
    clear_spinner(spinner);
    let listing = listing?;

    print_notice(listing.notice.as_deref());
    print_file_table(&listing.value);
    Ok(())
}

/// Handle the download command
///
/// Orchestrates the complete flow: argument validation, key resolution,
/// file tree lookup, size estimation, the streaming download, and the
/// extract/merge pipeline.
pub async fn handle_download(args: DownloadArgs, config: &AppConfig, quiet: bool) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let store = CredentialStore::default_location()?;
    let source = resolve_api_key(&store)?.ok_or(AuthError::MissingApiKey)?;
    info!("Using API key from {}", source.describe());

    let client = AihubClient::with_config(config.client_config(), Some(source.key()))?;
    let selection = args.selection();

    // Resolve the file tree first to validate keys and estimate size
    let spinner = listing_spinner(
        interactive(quiet),
        &format!("Fetching file tree for dataset {}...", args.dataset),
    );
    let listing = client.fetch_file_tree(&args.dataset).await;
    clear_spinner(spinner);
    let listing = listing?;
    print_notice(listing.notice.as_deref());

    let selected = select_files(&args.dataset, &listing.value, &selection)?;
    if selected.is_empty() {
        warn!("Dataset {} lists no downloadable files", args.dataset);
        println!("Dataset {} lists no downloadable files.", args.dataset);
        return Ok(());
    }

    let total = FileTree::total_size(&selected);
    println!(
        "Downloading {} file(s) from dataset {} (estimated {} ~ {})",
        selected.len(),
        args.dataset,
        format_bytes(total.min),
        format_bytes(total.max),
    );

    let output_dir = output_dir(&args, config);
    let archive_path = output_dir.join(files::ARCHIVE_FILE_NAME);

    let mut progress = DownloadProgress::new(interactive(quiet));
    let mut on_progress =
        |received: u64, total: Option<u64>| progress.update(received, total);

    client
        .download_dataset(
            &args.dataset,
            &selection,
            &archive_path,
            args.force,
            &mut on_progress,
        )
        .await?;
    progress.finish();
    println!("Downloaded {}", archive_path.display());

    if args.skip_extract {
        return Ok(());
    }

    let keep_archive = args.keep_archive || config.download.keep_archive;
    let merged = run_extract_pipeline(archive_path, output_dir, keep_archive).await?;
    if merged > 0 {
        println!("Reassembled {} split file(s)", merged);
    }
    println!("Download completed.");
    Ok(())
}

/// Extract the archive and merge split files on a blocking thread
async fn run_extract_pipeline(
    archive_path: PathBuf,
    output_dir: PathBuf,
    keep_archive: bool,
) -> Result<usize> {
    println!("Extracting and reassembling split files...");
    tokio::task::spawn_blocking(move || -> Result<usize> {
        archive::extract_archive(&archive_path, &output_dir)?;
        let merged = archive::merge_all(&output_dir)?;
        if !keep_archive {
            std::fs::remove_file(&archive_path)?;
            info!("Removed archive {}", archive_path.display());
        }
        Ok(merged)
    })
    .await
    .map_err(|e| AppError::generic(format!("extraction task failed: {}", e)))?
}

/// Resolve the files the selection names, erroring on unknown keys
fn select_files(
    dataset: &str,
    tree: &FileTree,
    selection: &FileSelection,
) -> Result<Vec<FileEntry>> {
    let all = tree.files();
    match selection {
        FileSelection::All => Ok(all),
        FileSelection::Keys(keys) => {
            let mut picked = Vec::with_capacity(keys.len());
            for key in keys {
                let entry = all.iter().find(|f| &f.key == key).ok_or_else(|| {
                    ApiError::UnknownFileKey {
                        dataset: dataset.to_string(),
                        key: key.clone(),
                    }
                })?;
                picked.push(entry.clone());
            }
            Ok(picked)
        }
    }
}

/// Output directory: explicit flag, then configured default, then "."
fn output_dir(args: &DownloadArgs, config: &AppConfig) -> PathBuf {
    args.output
        .clone()
        .or_else(|| config.download.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_notice(notice: Option<&str>) {
    if let Some(notice) = notice {
        println!("Notice from AIHub:");
        for line in notice.lines() {
            println!("  {}", line);
        }
        println!();
    }
}

fn print_dataset_table(datasets: &[DatasetEntry]) {
    let key_width = datasets
        .iter()
        .map(|d| d.key.len())
        .max()
        .unwrap_or(0)
        .max("KEY".len());

    println!("{:<key_width$}  NAME", "KEY");
    for dataset in datasets {
        println!("{:<key_width$}  {}", dataset.key, dataset.name);
    }
}

fn print_file_table(tree: &FileTree) {
    let file_entries = tree.files();
    let key_width = file_entries
        .iter()
        .map(|f| f.key.len())
        .max()
        .unwrap_or(0)
        .max("KEY".len());

    println!("{:<key_width$}  {:>10}  PATH", "KEY", "SIZE");
    for node in &tree.nodes {
        match &node.file {
            Some(leaf) => println!(
                "{:<key_width$}  {:>10}  {}",
                leaf.key,
                format_bytes(leaf.size.display),
                node.path
            ),
            None => println!("{:<key_width$}  {:>10}  {}", "-", "-", node.path),
        }
    }

    let total = FileTree::total_size(&file_entries);
    println!(
        "{} file(s), {} total (estimated {} ~ {})",
        file_entries.len(),
        format_bytes(total.display),
        format_bytes(total.min),
        format_bytes(total.max),
    );
}

/// Export the dataset table as CSV
fn export_dataset_csv(datasets: &[DatasetEntry], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::generic(format!("could not create {}: {}", path.display(), e)))?;

    writer
        .write_record(["key", "name"])
        .and_then(|_| {
            datasets
                .iter()
                .try_for_each(|d| writer.write_record([&d.key, &d.name]))
        })
        .map_err(|e| AppError::generic(format!("CSV write failed: {}", e)))?;

    writer
        .flush()
        .map_err(|e| AppError::generic(format!("CSV write failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::listing::parse_file_tree;
    use tempfile::TempDir;

    const TREE: &str = "\
571.dataset
├─ 01.data
│   ├─ training.zip | 11 MB | 69412
│   └─ validation.zip | 2 MB | 69413
└─ README.txt | 523 B | 69414";

    fn tree() -> FileTree {
        parse_file_tree("571", TREE).unwrap()
    }

    #[test]
    fn test_select_files_all() {
        let selected = select_files("571", &tree(), &FileSelection::All).unwrap();
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_select_files_by_key() {
        let selection = FileSelection::Keys(vec!["69413".to_string()]);
        let selected = select_files("571", &tree(), &selection).unwrap();
        assert_eq!(selected.len(), 1);
        assert!(selected[0].path.ends_with("validation.zip"));
    }

    #[test]
    fn test_select_files_unknown_key() {
        let selection = FileSelection::Keys(vec!["99999".to_string()]);
        let err = select_files("571", &tree(), &selection).unwrap_err();
        match err {
            AppError::Api(ApiError::UnknownFileKey { key, .. }) => assert_eq!(key, "99999"),
            other => panic!("expected UnknownFileKey, got {:?}", other),
        }
    }

    #[test]
    fn test_output_dir_resolution() {
        let args = DownloadArgs {
            dataset: "571".to_string(),
            files: "all".to_string(),
            output: None,
            keep_archive: false,
            skip_extract: false,
            force: false,
        };

        let mut config = AppConfig::default();
        assert_eq!(output_dir(&args, &config), PathBuf::from("."));

        config.download.output_dir = Some(PathBuf::from("/data"));
        assert_eq!(output_dir(&args, &config), PathBuf::from("/data"));

        let explicit = DownloadArgs {
            output: Some(PathBuf::from("/explicit")),
            ..args
        };
        assert_eq!(output_dir(&explicit, &config), PathBuf::from("/explicit"));
    }

    #[test]
    fn test_export_dataset_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("datasets.csv");
        let datasets = vec![
            DatasetEntry {
                key: "571".to_string(),
                name: "한국어 방언 발화 데이터".to_string(),
            },
            DatasetEntry {
                key: "134".to_string(),
                name: "Corpus, extended".to_string(),
            },
        ];

        export_dataset_csv(&datasets, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("key,name"));
        assert!(contents.contains("571"));
        // Comma-bearing names are quoted, so the CSV stays two columns
        assert!(contents.contains("\"Corpus, extended\""));
    }
}
