//! Core application logic for AIHub Fetcher
//!
//! This module contains the main application components: the portal HTTP
//! client, the listing parsers, the data models, and the archive
//! extraction/part-merge pipeline.

pub mod archive;
pub mod client;
pub mod listing;
pub mod models;

// Re-export main public API
pub use archive::{extract_archive, find_part_sets, merge_all, merge_parts, PartSet};
pub use client::{AihubClient, ClientConfig};
pub use listing::{FileLeaf, FileTree, Listing, TreeNode};
pub use models::{format_bytes, DatasetEntry, FileEntry, FileSelection, SizeBounds};
