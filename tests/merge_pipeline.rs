//! End-to-end tests for the archive extract and reassembly pipeline
//!
//! These build real tar archives the way the portal ships them (nested
//! directories, large files split into numbered parts) and drive the same
//! code path the download command runs after a transfer completes.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use aihub_fetcher::app::archive::{extract_archive, find_part_sets, merge_all};
use aihub_fetcher::errors::ExtractError;

/// Build `dataset.tar` from a staged directory tree
fn build_archive(staging: &Path, tar_path: &Path) {
    let mut builder = tar::Builder::new(File::create(tar_path).unwrap());
    builder.append_dir_all("dataset", staging).unwrap();
    builder.finish().unwrap();
}

/// Stage a dataset with one split file and one ordinary file
fn stage_split_dataset(staging: &Path, payload: &[u8]) {
    let images = staging.join("01.images");
    fs::create_dir_all(&images).unwrap();

    let third = payload.len() / 3;
    fs::write(images.join("images.zip.part0"), &payload[..third]).unwrap();
    fs::write(images.join("images.zip.part1"), &payload[third..2 * third]).unwrap();
    fs::write(images.join("images.zip.part2"), &payload[2 * third..]).unwrap();

    fs::write(staging.join("README.txt"), b"plain file, no parts").unwrap();
}

#[test]
fn extract_then_merge_restores_original_bytes() {
    let workspace = TempDir::new().unwrap();
    let staging = workspace.path().join("staging");
    let output = workspace.path().join("output");
    fs::create_dir_all(&output).unwrap();

    let payload: Vec<u8> = (0..10_000u32).flat_map(|i| i.to_le_bytes()).collect();
    stage_split_dataset(&staging, &payload);

    let tar_path = workspace.path().join("dataset.tar");
    build_archive(&staging, &tar_path);

    extract_archive(&tar_path, &output).unwrap();
    let merged = merge_all(&output).unwrap();
    assert_eq!(merged, 1);

    let restored = fs::read(output.join("dataset/01.images/images.zip")).unwrap();
    assert_eq!(restored, payload);

    // Parts removed, plain files untouched
    assert!(!output.join("dataset/01.images/images.zip.part0").exists());
    assert_eq!(
        fs::read(output.join("dataset/README.txt")).unwrap(),
        b"plain file, no parts"
    );
}

#[test]
fn merge_refuses_and_names_the_missing_part() {
    let workspace = TempDir::new().unwrap();
    let staging = workspace.path().join("staging");
    let output = workspace.path().join("output");
    fs::create_dir_all(&output).unwrap();

    let payload: Vec<u8> = vec![7u8; 3000];
    stage_split_dataset(&staging, &payload);
    // Simulate a lost segment
    fs::remove_file(staging.join("01.images/images.zip.part1")).unwrap();

    let tar_path = workspace.path().join("dataset.tar");
    build_archive(&staging, &tar_path);

    extract_archive(&tar_path, &output).unwrap();

    match merge_all(&output).unwrap_err() {
        ExtractError::MissingPart {
            target,
            missing_index,
        } => {
            assert!(target.ends_with("images.zip"));
            assert_eq!(missing_index, 1);
        }
        other => panic!("expected MissingPart, got {:?}", other),
    }

    // Refusal leaves the extracted tree untouched
    assert!(!output.join("dataset/01.images/images.zip").exists());
    assert!(output.join("dataset/01.images/images.zip.part0").exists());
    assert!(output.join("dataset/01.images/images.zip.part2").exists());
}

#[test]
fn part_discovery_spans_nested_directories() {
    let workspace = TempDir::new().unwrap();
    let root = workspace.path();

    let deep = root.join("a/b/c");
    fs::create_dir_all(&deep).unwrap();
    fs::write(deep.join("x.bin.part0"), b"one").unwrap();
    fs::write(deep.join("x.bin.part1"), b"two").unwrap();
    fs::write(root.join("a/y.bin.part0"), b"solo").unwrap();
    fs::write(root.join("a/not-a-part.bin"), b"ignore me").unwrap();

    let sets = find_part_sets(root).unwrap();
    let targets: Vec<PathBuf> = sets.iter().map(|s| s.target.clone()).collect();
    assert_eq!(sets.len(), 2);
    assert!(targets.iter().any(|t| t.ends_with("a/b/c/x.bin")));
    assert!(targets.iter().any(|t| t.ends_with("a/y.bin")));
}

#[test]
fn merge_is_idempotent_on_clean_trees() {
    let workspace = TempDir::new().unwrap();
    fs::write(workspace.path().join("plain.txt"), b"nothing to merge").unwrap();

    // No part sets anywhere: merge succeeds and reassembles nothing
    assert_eq!(merge_all(workspace.path()).unwrap(), 0);
    assert_eq!(merge_all(workspace.path()).unwrap(), 0);
}
