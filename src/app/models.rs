//! Data models for AIHub Fetcher
//!
//! This module defines the core data structures used throughout the
//! application: dataset and file descriptors, size bounds recovered from
//! the portal's rounded display sizes, and the file-selection type that
//! maps onto the download endpoint's `fileSn` parameter.

use serde::{Deserialize, Serialize};

/// One row of the portal's dataset table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Portal key used in file-tree and download URLs (e.g., "71265")
    pub key: String,
    /// Human-readable dataset name
    pub name: String,
}

/// Byte-size bounds implied by a rounded display size.
///
/// The portal reports sizes like `11 MB`, rounded to one decimal at most.
/// The true size therefore lies in a window around the displayed value;
/// the bounds are used for the pre-download size estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    /// Size as displayed, converted to bytes
    pub display: u64,
    /// Smallest size the display could have been rounded from
    pub min: u64,
    /// Largest size the display could have been rounded from
    pub max: u64,
}

impl SizeBounds {
    /// Parse a display size such as `11 MB`, `1.5GB`, or `523 B`.
    ///
    /// Units are binary multiples, matching what the portal reports.
    /// Returns `None` for anything that does not look like a size.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let stripped = text.strip_suffix('B')?.trim_end();

        let (number_part, unit) = match stripped.chars().last() {
            Some(c @ ('K' | 'M' | 'G' | 'T')) => (stripped[..stripped.len() - 1].trim_end(), c),
            _ => (stripped, ' '),
        };

        let value: f64 = number_part.trim().parse().ok()?;
        if value < 0.0 {
            return None;
        }

        let scale = match unit {
            ' ' => 1u64,
            'K' => 1u64 << 10,
            'M' => 1u64 << 20,
            'G' => 1u64 << 30,
            'T' => 1u64 << 40,
            _ => return None,
        };

        let display = (value * scale as f64) as u64;
        // Rounded displays hide up to half a unit below and a full unit above
        let min = (((value - 0.5).max(0.0)) * scale as f64) as u64;
        let max = ((value + 1.0) * scale as f64) as u64;

        Some(Self { display, min, max })
    }
}

/// A downloadable file inside a dataset's tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File key used in the `fileSn` download parameter
    pub key: String,
    /// Path of the file relative to the dataset root
    pub path: String,
    /// Size bounds recovered from the displayed size
    pub size: SizeBounds,
}

/// Which files of a dataset to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    /// Download the entire dataset
    All,
    /// Download only the named file keys
    Keys(Vec<String>),
}

impl FileSelection {
    /// Parse the CLI form: `all` or a comma-separated list of file keys
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Self::All;
        }
        let keys = trimmed
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self::Keys(keys)
    }

    /// Value for the download endpoint's `fileSn` query parameter
    pub fn file_sn(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Keys(keys) => keys.join(","),
        }
    }

    /// Keys named by this selection, empty for `All`
    pub fn keys(&self) -> &[String] {
        match self {
            Self::All => &[],
            Self::Keys(keys) => keys,
        }
    }
}

impl std::fmt::Display for FileSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_sn())
    }
}

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bounds_plain_bytes() {
        let size = SizeBounds::parse("523 B").unwrap();
        assert_eq!(size.display, 523);
        assert_eq!(size.max, 524);
    }

    #[test]
    fn test_size_bounds_units() {
        let size = SizeBounds::parse("11 MB").unwrap();
        assert_eq!(size.display, 11 * 1024 * 1024);
        assert_eq!(size.min, (10.5 * 1024.0 * 1024.0) as u64);
        assert_eq!(size.max, 12 * 1024 * 1024);

        let size = SizeBounds::parse("1.5GB").unwrap();
        assert_eq!(size.display, (1.5 * (1u64 << 30) as f64) as u64);
    }

    #[test]
    fn test_size_bounds_rejects_garbage() {
        assert!(SizeBounds::parse("").is_none());
        assert!(SizeBounds::parse("eleven MB").is_none());
        assert!(SizeBounds::parse("12 XB").is_none());
        assert!(SizeBounds::parse("-3 MB").is_none());
    }

    #[test]
    fn test_file_selection_all() {
        let selection = FileSelection::parse("all");
        assert_eq!(selection, FileSelection::All);
        assert_eq!(selection.file_sn(), "all");

        // Case-insensitive
        assert_eq!(FileSelection::parse("ALL"), FileSelection::All);
    }

    #[test]
    fn test_file_selection_keys() {
        let selection = FileSelection::parse("69412, 69413,69414");
        assert_eq!(
            selection,
            FileSelection::Keys(vec![
                "69412".to_string(),
                "69413".to_string(),
                "69414".to_string()
            ])
        );
        assert_eq!(selection.file_sn(), "69412,69413,69414");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(11 * 1024 * 1024), "11.0 MB");
    }
}
