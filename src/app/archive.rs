//! Archive extraction and part-file reassembly
//!
//! Dataset downloads arrive as a single tar archive. Large files inside it
//! are split into `name.part0`, `name.part1`, ... segments that have to be
//! concatenated back together after extraction. Reassembly is all-or-
//! nothing: every part set under the output directory is checked for gaps
//! before the first byte is merged.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tar::Archive;
use tracing::{debug, info};

use crate::constants::files;
use crate::errors::{ExtractError, ExtractResult};

/// Unpack the downloaded tar archive into `dest`
pub fn extract_archive(archive_path: &Path, dest: &Path) -> ExtractResult<()> {
    if !archive_path.is_file() {
        return Err(ExtractError::ArchiveNotFound {
            path: archive_path.to_path_buf(),
        });
    }

    let file = File::open(archive_path)?;
    let mut archive = Archive::new(BufReader::new(file));
    archive.unpack(dest)?;

    info!("Extracted {} into {}", archive_path.display(), dest.display());
    Ok(())
}

/// A reassembly job: the target file and its numbered parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSet {
    /// Path the merged file will be written to
    pub target: PathBuf,
    /// Part index and path, sorted by index
    pub parts: Vec<(u32, PathBuf)>,
}

impl PartSet {
    /// First absent index in the part sequence, if the set is incomplete.
    ///
    /// Sequences may start at 0 or 1; anything later means the leading
    /// parts are missing.
    pub fn missing_index(&self) -> Option<u32> {
        let base = match self.parts.first() {
            Some((first, _)) if *first <= 1 => *first,
            Some((first, _)) => return Some(first - 1),
            None => return None,
        };
        for (offset, (index, _)) in self.parts.iter().enumerate() {
            let expected = base + offset as u32;
            if *index != expected {
                return Some(expected);
            }
        }
        None
    }
}

/// Collect every part set under `root`, walking subdirectories
pub fn find_part_sets(root: &Path) -> ExtractResult<Vec<PartSet>> {
    let mut sets = Vec::new();
    scan_directory(root, &mut sets)?;
    sets.sort_by(|a, b| a.target.cmp(&b.target));
    Ok(sets)
}

fn scan_directory(dir: &Path, sets: &mut Vec<PartSet>) -> ExtractResult<()> {
    let mut groups: BTreeMap<PathBuf, Vec<(u32, PathBuf)>> = BTreeMap::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            scan_directory(&path, sets)?;
        } else if let Some((target_name, index)) = split_part_name(&path) {
            groups
                .entry(dir.join(target_name))
                .or_default()
                .push((index, path));
        }
    }

    for (target, mut parts) in groups {
        parts.sort_by_key(|(index, _)| *index);
        sets.push(PartSet { target, parts });
    }
    Ok(())
}

/// Split `name.part{N}` into the merged file name and the part index.
///
/// The suffix match is case-insensitive, like the portal's own tooling.
/// Returns `None` for names that are not numbered parts.
fn split_part_name(path: &Path) -> Option<(String, u32)> {
    let name = path.file_name()?.to_str()?;
    let lower = name.to_ascii_lowercase();
    let pos = lower.rfind(files::PART_SUFFIX)?;
    let stem = &name[..pos];
    let index: u32 = name[pos + files::PART_SUFFIX.len()..].parse().ok()?;
    if stem.is_empty() {
        return None;
    }
    Some((stem.to_string(), index))
}

/// Concatenate one part set into its target and delete the parts.
///
/// Returns the number of bytes written.
pub fn merge_parts(set: &PartSet) -> ExtractResult<u64> {
    if let Some(missing_index) = set.missing_index() {
        return Err(ExtractError::MissingPart {
            target: set.target.clone(),
            missing_index,
        });
    }

    debug!(
        "Merging {} parts into {}",
        set.parts.len(),
        set.target.display()
    );

    let mut output = BufWriter::new(File::create(&set.target)?);
    let mut written = 0u64;
    for (_, part) in &set.parts {
        let mut reader = File::open(part)?;
        written += io::copy(&mut reader, &mut output)?;
    }
    output.flush()?;
    drop(output);

    for (_, part) in &set.parts {
        fs::remove_file(part)?;
    }

    info!(
        "Merged {} ({} parts, {} bytes)",
        set.target.display(),
        set.parts.len(),
        written
    );
    Ok(written)
}

/// Reassemble every split file under `root`.
///
/// All part sets are checked for completeness before any merge starts, so
/// a single gap leaves the extracted tree untouched. Returns the number of
/// files reassembled.
pub fn merge_all(root: &Path) -> ExtractResult<usize> {
    let sets = find_part_sets(root)?;

    for set in &sets {
        if let Some(missing_index) = set.missing_index() {
            return Err(ExtractError::MissingPart {
                target: set.target.clone(),
                missing_index,
            });
        }
    }

    for set in &sets {
        merge_parts(set)?;
    }
    Ok(sets.len())
}
