//! Shared test utilities for the smugsync test suite.
//!
//! Provides on-disk fixture builders and assertion helpers for the
//! operations recorded by [`MockRemote`](crate::remote::tests::MockRemote).
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_tree(tmp.path(), &["Travel/Japan/1.jpg", "Family/dinner.jpg"]);
//! ```

use std::fs;
use std::path::Path;

use crate::remote::tests::RecordedOp;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create every relative path under `root`, creating parent directories.
///
/// Each file's content is its own relative path, so distinct files always
/// hash differently.
pub fn write_tree(root: &Path, paths: &[&str]) {
    for rel in paths {
        write_file(root, rel, rel.as_bytes());
    }
}

/// Write one file with explicit content, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

// =========================================================================
// Recorded operation helpers
// =========================================================================

/// Names of every node created, in order.
pub fn created_names(ops: &[RecordedOp]) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match op {
            RecordedOp::CreateNode { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// File names of every upload, in order; replacements are suffixed with `*`.
pub fn uploaded_files(ops: &[RecordedOp]) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match op {
            RecordedOp::Upload {
                file_name,
                replace: false,
                ..
            } => Some(file_name.clone()),
            RecordedOp::Upload {
                file_name,
                replace: true,
                ..
            } => Some(format!("{file_name}*")),
            _ => None,
        })
        .collect()
}

/// File names of every deleted image, in order.
pub fn deleted_files(ops: &[RecordedOp]) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match op {
            RecordedOp::Delete { file_name } => Some(file_name.clone()),
            _ => None,
        })
        .collect()
}
