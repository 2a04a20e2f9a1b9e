//! Local directory scanning and classification.
//!
//! The scanner looks at one directory level at a time and decides what the
//! directory becomes on the remote side:
//!
//! ```text
//! Photos/                          # Source root (must be folder-shaped)
//! ├── Travel/                      # Folder: holds directories
//! │   ├── Japan/                   # Gallery: holds images
//! │   │   ├── 001.jpg
//! │   │   └── 002.jpg
//! │   └── Italy/
//! │       └── rome.jpg
//! ├── Family/
//! │   ├── .smuggallery             # Marker: sync as a gallery anyway
//! │   ├── outtakes/                # ...so this subdirectory is ignored
//! │   └── dinner.jpg
//! └── Drafts/                      # Empty (no images, no dirs): skipped
//!     └── notes.txt
//! ```
//!
//! ## Classification
//!
//! 1. A folder marker file makes the directory a folder.
//! 2. A gallery marker file makes the directory a gallery.
//! 3. Both markers together are an error.
//! 4. Without markers: any subdirectory → folder (images beside them are
//!    ignored and reported), only images → gallery, neither → empty.
//!
//! Hidden entries (leading `.`) are never images or subdirectories. Image
//! detection is a case-insensitive extension match against the configured
//! list; other files are ignored.

use crate::config::ScanConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Source root must only contain directories, found images in: {0}")]
    ImagesAtRoot(PathBuf),
    #[error("Source root is marked as a gallery but must sync as a folder: {0}")]
    GalleryRoot(PathBuf),
    #[error("Directory holds both folder and gallery markers: {0}")]
    ConflictingMarkers(PathBuf),
}

/// Rules deciding which files are images and which files are markers.
#[derive(Debug, Clone)]
pub struct ScanRules {
    /// Lower-cased extensions without the dot.
    pub extensions: Vec<String>,
    pub folder_marker: String,
    pub gallery_marker: String,
}

impl ScanRules {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            folder_marker: config.folder_marker.clone(),
            gallery_marker: config.gallery_marker.clone(),
        }
    }

    fn is_image_name(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return false;
        }
        Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

impl Default for ScanRules {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

/// What a local directory maps to remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DirKind {
    /// Container of containers.
    Folder,
    /// Container of images.
    Gallery,
    /// Nothing to sync.
    Empty,
}

/// An image file found directly inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    /// File name, used as the remote file name.
    pub name: String,
    pub path: PathBuf,
}

/// One directory, scanned one level deep.
#[derive(Debug, Clone)]
pub struct LocalDir {
    pub name: String,
    pub path: PathBuf,
    pub kind: DirKind,
    /// Images, sorted by name.
    pub images: Vec<LocalImage>,
    /// Visible subdirectories, sorted by name.
    pub subdirs: Vec<PathBuf>,
}

impl LocalDir {
    /// Entries the classification disregards: images of a folder, or
    /// subdirectories of a gallery.
    pub fn ignored_entries(&self) -> usize {
        match self.kind {
            DirKind::Folder => self.images.len(),
            DirKind::Gallery => self.subdirs.len(),
            DirKind::Empty => 0,
        }
    }
}

/// Raw contents of one directory level, before classification.
struct Listing {
    images: Vec<LocalImage>,
    subdirs: Vec<PathBuf>,
    folder_marker: bool,
    gallery_marker: bool,
}

fn list_dir(path: &Path, rules: &ScanRules) -> Result<Listing, ScanError> {
    let mut listing = Listing {
        images: Vec::new(),
        subdirs: Vec::new(),
        folder_marker: false,
        gallery_marker: false,
    };

    let entries = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        if entry.file_type().is_dir() {
            if !name.starts_with('.') {
                listing.subdirs.push(entry.into_path());
            }
        } else if name == rules.folder_marker {
            listing.folder_marker = true;
        } else if name == rules.gallery_marker {
            listing.gallery_marker = true;
        } else if rules.is_image_name(&name) {
            listing.images.push(LocalImage {
                name,
                path: entry.into_path(),
            });
        }
    }
    Ok(listing)
}

/// Scan a single directory, one level deep, and classify it.
pub fn scan_dir(path: &Path, rules: &ScanRules) -> Result<LocalDir, ScanError> {
    let listing = list_dir(path, rules)?;

    let kind = match (listing.folder_marker, listing.gallery_marker) {
        (true, true) => return Err(ScanError::ConflictingMarkers(path.to_path_buf())),
        (true, false) => DirKind::Folder,
        (false, true) => DirKind::Gallery,
        (false, false) if !listing.subdirs.is_empty() => DirKind::Folder,
        (false, false) if !listing.images.is_empty() => DirKind::Gallery,
        (false, false) => DirKind::Empty,
    };

    Ok(LocalDir {
        name: dir_name(path),
        path: path.to_path_buf(),
        kind,
        images: listing.images,
        subdirs: listing.subdirs,
    })
}

/// Check the source root: it must exist, be a directory, hold no images at
/// its top level, and not be marked as a gallery. The root is synced into
/// a remote folder.
pub fn validate_source(root: &Path, rules: &ScanRules) -> Result<LocalDir, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let listing = list_dir(root, rules)?;
    if listing.folder_marker && listing.gallery_marker {
        return Err(ScanError::ConflictingMarkers(root.to_path_buf()));
    }
    if !listing.images.is_empty() {
        return Err(ScanError::ImagesAtRoot(root.to_path_buf()));
    }
    if listing.gallery_marker {
        return Err(ScanError::GalleryRoot(root.to_path_buf()));
    }
    Ok(LocalDir {
        name: dir_name(root),
        path: root.to_path_buf(),
        kind: DirKind::Folder,
        images: listing.images,
        subdirs: listing.subdirs,
    })
}

/// One directory in the offline tree view.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    /// 0 for direct children of the source root.
    pub depth: usize,
    pub name: String,
    pub kind: DirKind,
    pub image_count: usize,
    /// Entries the classification disregarded.
    pub ignored: usize,
}

/// Recursively scan the whole source tree without touching the network.
///
/// Fails on the first directory that cannot be classified, exactly like a
/// real sync would.
pub fn scan_tree(root: &Path, rules: &ScanRules) -> Result<Vec<TreeEntry>, ScanError> {
    let dir = validate_source(root, rules)?;
    let mut entries = Vec::new();
    scan_tree_recursive(&dir.subdirs, 0, rules, &mut entries)?;
    Ok(entries)
}

fn scan_tree_recursive(
    subdirs: &[PathBuf],
    depth: usize,
    rules: &ScanRules,
    entries: &mut Vec<TreeEntry>,
) -> Result<(), ScanError> {
    for subdir in subdirs {
        let dir = scan_dir(subdir, rules)?;
        entries.push(TreeEntry {
            depth,
            name: dir.name.clone(),
            kind: dir.kind,
            image_count: if dir.kind == DirKind::Gallery {
                dir.images.len()
            } else {
                0
            },
            ignored: dir.ignored_entries(),
        });
        if dir.kind == DirKind::Folder {
            scan_tree_recursive(&dir.subdirs, depth + 1, rules, entries)?;
        }
    }
    Ok(())
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
