//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Sync
//!
//! Progress is printed as the sync runs. Containers lead with their path
//! relative to the source root; files are indented under their gallery with
//! a positional counter.
//!
//! ```text
//! Drafts (skipped, nothing to sync)
//! Travel (new folder)
//! Travel/Japan (new gallery)
//!     2 local, 1 remote
//!     [1/2] unchanged 001.jpg
//!     [2/2] uploaded 002.jpg
//!     deleted old.jpg
//!
//! Created 1 folder, 1 gallery
//! 1 uploaded, 0 replaced, 1 unchanged, 1 deleted
//! ```
//!
//! Warnings start with `!`:
//!
//! ```text
//!     ! kept 5 of 10 remote images: 50% would be deleted, threshold is 15%
//!     ! expected 12 remote images, found 11
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 Drafts (skipped)
//! 002 Family (1 photo, 1 ignored)
//! 003 Travel
//!     001 Italy (1 photo)
//!     002 Japan (2 photos)
//!
//! 1 folder, 3 galleries, 4 photos
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::reconcile::{FileStatus, SyncEvent, SyncReport};
use crate::scan::{DirKind, TreeEntry};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 folder` / `2 folders`.
fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

// ============================================================================
// Sync
// ============================================================================

/// Format one progress event.
pub fn format_sync_event(event: &SyncEvent) -> Vec<String> {
    match event {
        SyncEvent::ContainerReady {
            path,
            kind,
            created,
            ignored,
        } => {
            let label = match kind {
                DirKind::Folder => "folder",
                DirKind::Gallery => "gallery",
                DirKind::Empty => "directory",
            };
            let mut lines = vec![if *created {
                format!("{path} (new {label})")
            } else {
                path.clone()
            }];
            if *ignored > 0 {
                lines.push(format!(
                    "{}ignored {}",
                    indent(1),
                    plural(*ignored, "entry", "entries")
                ));
            }
            lines
        }
        SyncEvent::DirectorySkipped { path } => {
            vec![format!("{path} (skipped, nothing to sync)")]
        }
        SyncEvent::GalleryStarted {
            local_count,
            remote_count,
            ..
        } => vec![format!(
            "{}{local_count} local, {remote_count} remote",
            indent(1)
        )],
        SyncEvent::FileSynced {
            index,
            total,
            name,
            status,
        } => {
            let verb = match status {
                FileStatus::Uploaded => "uploaded",
                FileStatus::Replaced => "replaced",
                FileStatus::Unchanged => "unchanged",
            };
            let width = total.to_string().len();
            vec![format!(
                "{}[{index:>width$}/{total}] {verb} {name}",
                indent(1)
            )]
        }
        SyncEvent::FileDeleted { name } => vec![format!("{}deleted {name}", indent(1))],
        SyncEvent::DeletionSuppressed {
            candidates,
            remote_total,
            threshold,
            ..
        } => {
            let share = *candidates as f64 / (*remote_total).max(1) as f64;
            vec![format!(
                "{}! kept {candidates} of {remote_total} remote images: \
                 {:.0}% would be deleted, threshold is {:.0}%",
                indent(1),
                share * 100.0,
                threshold * 100.0
            )]
        }
        SyncEvent::CountMismatch {
            expected, actual, ..
        } => vec![format!(
            "{}! expected {expected} remote images, found {actual}",
            indent(1)
        )],
    }
}

/// Format the closing summary of a sync run.
pub fn format_sync_report(report: &SyncReport, dry_run: bool) -> Vec<String> {
    let mut lines = vec![String::new()];
    if report.folders_created + report.galleries_created > 0 {
        lines.push(format!(
            "Created {}, {}",
            plural(report.folders_created, "folder", "folders"),
            plural(report.galleries_created, "gallery", "galleries")
        ));
    }
    lines.push(report.to_string());
    if report.suppressed_galleries > 0 {
        lines.push(format!(
            "Deletions held back in {}",
            plural(report.suppressed_galleries, "gallery", "galleries")
        ));
    }
    if dry_run {
        lines.push("Dry run: no changes were made".to_string());
    }
    lines
}

pub fn print_sync_report(report: &SyncReport, dry_run: bool) {
    for line in format_sync_report(report, dry_run) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the offline tree view of a source directory.
///
/// Each entry leads with its positional index among its siblings.
pub fn format_check_output(entries: &[TreeEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut positions: Vec<usize> = Vec::new();
    let (mut folders, mut galleries, mut photos) = (0, 0, 0);

    for entry in entries {
        positions.truncate(entry.depth + 1);
        positions.resize(entry.depth + 1, 0);
        positions[entry.depth] += 1;

        let mut details = Vec::new();
        match entry.kind {
            DirKind::Folder => folders += 1,
            DirKind::Gallery => {
                galleries += 1;
                photos += entry.image_count;
                details.push(plural(entry.image_count, "photo", "photos"));
            }
            DirKind::Empty => details.push("skipped".to_string()),
        }
        if entry.ignored > 0 {
            details.push(format!("{} ignored", entry.ignored));
        }

        let header = format!("{} {}", format_index(positions[entry.depth]), entry.name);
        lines.push(if details.is_empty() {
            format!("{}{}", indent(entry.depth), header)
        } else {
            format!("{}{} ({})", indent(entry.depth), header, details.join(", "))
        });
    }

    lines.push(String::new());
    lines.push(format!(
        "{}, {}, {}",
        plural(folders, "folder", "folders"),
        plural(galleries, "gallery", "galleries"),
        plural(photos, "photo", "photos")
    ));
    lines
}

pub fn print_check_output(entries: &[TreeEntry]) {
    for line in format_check_output(entries) {
        println!("{}", line);
    }
}

// ============================================================================
// Albums
// ============================================================================

/// Format the album listing of the account.
pub fn format_albums(names: &[String]) -> Vec<String> {
    let mut lines: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} {}", format_index(i + 1), name))
        .collect();
    lines.push(plural(names.len(), "album", "albums"));
    lines
}

pub fn print_albums(names: &[String]) {
    for line in format_albums(names) {
        println!("{}", line);
    }
}
