//! Parsers for the portal's plain-text listing responses
//!
//! The AIHub portal answers its listing endpoints with human-oriented text:
//! an optional UTF-8 transcoding preamble, an optional boxed notice section,
//! then either a comma-separated dataset table or an ASCII file tree drawn
//! with box characters. This module strips the decoration and turns the
//! payload into typed entries.

use crate::app::models::{DatasetEntry, FileEntry, SizeBounds};
use crate::errors::{ApiError, ApiResult};

/// A parsed listing plus the notice the portal attached to the response
#[derive(Debug, Clone)]
pub struct Listing<T> {
    /// The parsed payload
    pub value: T,
    /// Notice section content, when the portal included one
    pub notice: Option<String>,
}

/// A listing response with portal decoration removed
#[derive(Debug, Clone)]
pub struct CleanedResponse {
    /// Response text with preamble and notice stripped
    pub body: String,
    /// Notice section content, when the portal included one
    pub notice: Option<String>,
}

/// Strip the transcoding preamble and extract the notice section.
///
/// The preamble is exactly three lines advising the caller about UTF-8
/// output. The notice section is fenced by `==== 공지 사항 ====` style
/// lines; its content is returned separately so callers can surface it
/// without it polluting the parsers.
pub fn clean_response(raw: &str) -> CleanedResponse {
    let mut lines: Vec<&str> = raw.lines().collect();

    if lines.len() >= 3
        && lines[0].contains("UTF-8")
        && lines[1].contains("output normally")
        && lines[2].contains("modify the character information")
    {
        lines.drain(..3);
    }

    let mut notice = None;
    if let Some(start) = lines.iter().position(|l| is_notice_fence(l)) {
        if let Some(rel_end) = lines[start + 1..].iter().position(|l| is_fence(l)) {
            let end = start + 1 + rel_end;
            let content = lines[start + 1..end].join("\n");
            if !content.trim().is_empty() {
                notice = Some(content.trim().to_string());
            }
            // Drop the fences and the spacer line the portal leaves after them
            let tail_start = (end + 2).min(lines.len());
            let mut kept: Vec<&str> = lines[..start].to_vec();
            kept.extend_from_slice(&lines[tail_start..]);
            lines = kept;
        }
    }

    CleanedResponse {
        body: lines.join("\n").trim().to_string(),
        notice,
    }
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '=')
}

fn is_notice_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("===") && trimmed.contains("공지") && trimmed.contains("사항")
}

/// Parse the dataset table returned by the dataset-list endpoint.
///
/// Rows sit between a `====` header and footer, one dataset per line as
/// `key, name`. The name itself may contain commas, so only the first
/// comma splits.
pub fn parse_dataset_list(body: &str) -> ApiResult<Vec<DatasetEntry>> {
    let lines: Vec<&str> = body.lines().collect();

    let header = lines.iter().position(|l| l.contains('='));
    let footer = lines.iter().rposition(|l| l.contains('='));

    let rows: &[&str] = match (header, footer) {
        (Some(h), Some(f)) if f > h => &lines[h + 1..f],
        _ => &lines[..],
    };

    let mut datasets = Vec::new();
    for line in rows {
        if let Some((key, name)) = line.split_once(',') {
            let key = key.trim();
            let name = name.trim();
            if !key.is_empty() && !name.is_empty() {
                datasets.push(DatasetEntry {
                    key: key.to_string(),
                    name: name.to_string(),
                });
            }
        }
    }

    if datasets.is_empty() {
        return Err(ApiError::EmptyDatasetList);
    }
    Ok(datasets)
}

/// A node of a parsed dataset file tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Full path from (and including) the dataset root directory
    pub path: String,
    /// Populated for downloadable leaves; directories carry `None`
    pub file: Option<FileLeaf>,
}

/// Leaf metadata attached to downloadable tree nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLeaf {
    /// File key used in the `fileSn` download parameter
    pub key: String,
    /// Size bounds recovered from the displayed size
    pub size: SizeBounds,
}

/// A dataset's file tree as reported by the portal
#[derive(Debug, Clone)]
pub struct FileTree {
    /// Dataset root directory name (first line of the listing)
    pub root: String,
    /// All nodes in listing order, root first
    pub nodes: Vec<TreeNode>,
}

impl FileTree {
    /// Downloadable files in listing order
    pub fn files(&self) -> Vec<FileEntry> {
        self.nodes
            .iter()
            .filter_map(|node| {
                node.file.as_ref().map(|leaf| FileEntry {
                    key: leaf.key.clone(),
                    path: node.path.clone(),
                    size: leaf.size,
                })
            })
            .collect()
    }

    /// Look up a downloadable file by its key
    pub fn find(&self, key: &str) -> Option<FileEntry> {
        self.files().into_iter().find(|f| f.key == key)
    }

    /// Summed size bounds over the given files
    pub fn total_size(files: &[FileEntry]) -> SizeBounds {
        let mut total = SizeBounds {
            display: 0,
            min: 0,
            max: 0,
        };
        for file in files {
            total.display += file.size.display;
            total.min += file.size.min;
            total.max += file.size.max;
        }
        total
    }
}

/// Parse the ASCII tree drawn by the file-tree endpoint.
///
/// Each non-root line is `{prefix}{connector} {name}` where the prefix is
/// built from four-column `│   ` cells and the connector is `├─` or `└─`.
/// Leaf lines append ` | {size} | {file_key}` columns. Lines that fail to
/// parse as either are skipped, matching the portal's habit of mixing
/// decoration into the listing.
pub fn parse_file_tree(dataset: &str, body: &str) -> ApiResult<FileTree> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty() && !is_fence(l));

    let root_line = lines.next().ok_or_else(|| ApiError::MalformedFileTree {
        dataset: dataset.to_string(),
        reason: "empty response".to_string(),
    })?;
    let root = strip_connector(root_line).1.trim().to_string();
    if root.is_empty() {
        return Err(ApiError::MalformedFileTree {
            dataset: dataset.to_string(),
            reason: "missing root line".to_string(),
        });
    }

    let mut nodes = vec![TreeNode {
        path: root.clone(),
        file: None,
    }];

    // Ancestor directories as (depth, name), nearest last
    let mut ancestors: Vec<(usize, String)> = Vec::new();

    for line in lines {
        let (prefix, rest) = strip_connector(line);
        let Some(prefix) = prefix else {
            continue; // no connector: stray decoration
        };
        let depth = prefix.chars().count() / 4 + 1;

        let (name, leaf) = if rest.contains('|') {
            match parse_leaf_columns(rest) {
                Some((name, leaf)) => (name, Some(leaf)),
                None => continue, // unparsable leaf columns
            }
        } else {
            (rest.trim().to_string(), None)
        };
        if name.is_empty() {
            continue;
        }

        while ancestors.last().is_some_and(|(d, _)| *d >= depth) {
            ancestors.pop();
        }

        let mut path = root.clone();
        for (_, dir) in &ancestors {
            path.push('/');
            path.push_str(dir);
        }
        path.push('/');
        path.push_str(&name);

        ancestors.push((depth, name));
        nodes.push(TreeNode { path, file: leaf });
    }

    Ok(FileTree { root, nodes })
}

/// Split a tree line at its `├─`/`└─` connector.
///
/// Returns the prefix before the connector (or `None` when the line has no
/// connector, as the root line does) and the text after it.
fn strip_connector(line: &str) -> (Option<&str>, &str) {
    let connector = line
        .char_indices()
        .find(|(_, c)| *c == '├' || *c == '└')
        .map(|(i, _)| i);

    match connector {
        Some(idx) => {
            let rest = line[idx..]
                .trim_start_matches(&['├', '└', '─'][..])
                .trim_start();
            (Some(&line[..idx]), rest)
        }
        None => (None, line.trim_start_matches(&['│', '─', ' '][..])),
    }
}

/// Parse the ` | {size} | {key}` columns of a leaf line
fn parse_leaf_columns(rest: &str) -> Option<(String, FileLeaf)> {
    let mut columns = rest.split('|');
    let name = columns.next()?.trim();
    let size_text = columns.next()?.trim();
    let key = columns.next()?.trim();
    if columns.next().is_some() || name.is_empty() || key.is_empty() {
        return None;
    }

    let size = SizeBounds::parse(size_text)?;
    Some((
        name.to_string(),
        FileLeaf {
            key: key.to_string(),
            size,
        },
    ))
}
