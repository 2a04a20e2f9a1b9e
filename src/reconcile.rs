//! Tree reconciliation: mirror a local directory tree onto remote nodes.
//!
//! The walk moves through the local tree and the remote tree in lock-step.
//! Every local directory is scanned and classified (see [`crate::scan`]);
//! its remote counterpart is found by name among the children of the
//! parent node, or created when missing:
//!
//! ```text
//! local                     remote
//! Photos/            ──►    <destination folder>
//! ├── Travel/        ──►    ├── Travel        (Folder)
//! │   └── Japan/     ──►    │   └── Japan     (Album, files diffed)
//! └── Drafts/               └── (skipped: nothing to sync)
//! ```
//!
//! The local side always wins. Remote containers are never removed, and a
//! remote node whose type disagrees with the local directory stops the run
//! rather than being replaced.
//!
//! Any error aborts the whole run. Work already done stays done, and a
//! re-run picks up where the failed one stopped because unchanged files are
//! skipped by content hash.

use crate::config::SyncConfig;
use crate::gallery;
use crate::naming::url_name;
use crate::remote::{NewNode, Node, NodeKind, Remote, RemoteError};
use crate::scan::{self, DirKind, LocalDir, ScanError, ScanRules};
use crate::tree;
use std::fmt;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{0}")]
    Scan(#[from] ScanError),
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Destination not found: {0}")]
    DestinationNotFound(String),
    #[error("Destination {path} is a {kind} node, not a folder")]
    DestinationNotFolder { path: String, kind: &'static str },
    #[error("{path}: local directory is a {expected} but the remote node is a {found}")]
    KindMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Unknown album template: {0}")]
    UnknownTemplate(String),
    #[error("No album key for {0}")]
    MissingAlbumKey(String),
}

/// Everything that shapes a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub rules: ScanRules,
    pub prune: bool,
    pub delete_threshold: f64,
    /// Plan and report, but send nothing that changes the remote.
    pub dry_run: bool,
    pub privacy: String,
    /// Album template name; resolved to a URI once per run.
    pub template: Option<String>,
    pub folder_delay: Duration,
    pub upload_delay: Duration,
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            rules: ScanRules::from_config(&config.scan),
            prune: config.sync.prune,
            delete_threshold: config.sync.delete_threshold,
            dry_run: false,
            privacy: config.gallery.privacy.clone(),
            template: config.gallery.template.clone(),
            folder_delay: Duration::from_secs(config.sync.folder_delay_secs),
            upload_delay: Duration::from_millis(config.sync.upload_delay_ms),
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Outcome of one local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Uploaded,
    Replaced,
    Unchanged,
}

/// Progress reported while a sync runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A local directory was matched to (or created as) a remote node.
    ContainerReady {
        path: String,
        kind: DirKind,
        created: bool,
        /// Entries the classification disregarded.
        ignored: usize,
    },
    /// A directory with neither images nor subdirectories.
    DirectorySkipped { path: String },
    GalleryStarted {
        path: String,
        local_count: usize,
        remote_count: usize,
    },
    FileSynced {
        index: usize,
        total: usize,
        name: String,
        status: FileStatus,
    },
    FileDeleted { name: String },
    DeletionSuppressed {
        path: String,
        candidates: usize,
        remote_total: usize,
        threshold: f64,
    },
    CountMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },
}

/// Totals of a sync run. In a dry run the counts are what would happen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub folders_created: usize,
    pub galleries_created: usize,
    pub uploaded: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub deleted: usize,
    /// Galleries whose deletions were held back by the threshold.
    pub suppressed_galleries: usize,
    pub skipped_dirs: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} uploaded, {} replaced, {} unchanged, {} deleted",
            self.uploaded, self.replaced, self.unchanged, self.deleted
        )
    }
}

pub(crate) fn emit(progress: Option<&Sender<SyncEvent>>, event: SyncEvent) {
    if let Some(tx) = progress {
        tx.send(event).ok();
    }
}

/// Mirror the local tree at `source` into the remote folder at `dest`.
///
/// The source is validated before any request is made, and the destination
/// and album template are resolved before anything is created.
pub fn sync_tree(
    remote: &dyn Remote,
    source: &Path,
    dest: &str,
    opts: &SyncOptions,
    progress: Option<Sender<SyncEvent>>,
) -> Result<SyncReport, SyncError> {
    let root = scan::validate_source(source, &opts.rules)?;
    let dest_node = tree::resolve_path(remote, dest)?;
    let template_uri = match &opts.template {
        Some(name) => Some(resolve_template(remote, name)?),
        None => None,
    };

    let walker = Walker {
        remote,
        opts,
        template_uri,
        progress: progress.as_ref(),
    };
    let mut report = SyncReport::default();
    walker.sync_folder(&root, Some(&dest_node.id), "", &mut report)?;
    Ok(report)
}

fn resolve_template(remote: &dyn Remote, name: &str) -> Result<String, SyncError> {
    remote
        .album_templates()?
        .into_iter()
        .find(|t| t.name == name)
        .map(|t| t.uri)
        .ok_or_else(|| SyncError::UnknownTemplate(name.to_string()))
}

struct Walker<'a> {
    remote: &'a dyn Remote,
    opts: &'a SyncOptions,
    template_uri: Option<String>,
    progress: Option<&'a Sender<SyncEvent>>,
}

impl Walker<'_> {
    /// Sync the subdirectories of a folder. `node_id` is `None` when the
    /// folder would be created by a dry run.
    fn sync_folder(
        &self,
        dir: &LocalDir,
        node_id: Option<&str>,
        path: &str,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let children = match node_id {
            Some(id) => self.remote.children(id)?,
            None => Vec::new(),
        };

        for subdir in &dir.subdirs {
            let child = scan::scan_dir(subdir, &self.opts.rules)?;
            let child_path = join_path(path, &child.name);

            let wanted = match child.kind {
                DirKind::Folder => NodeKind::Folder,
                DirKind::Gallery => NodeKind::Album,
                DirKind::Empty => {
                    log::debug!("skipping {child_path}: nothing to sync");
                    report.skipped_dirs += 1;
                    emit(self.progress, SyncEvent::DirectorySkipped { path: child_path });
                    continue;
                }
            };

            let existing = children.iter().find(|n| n.name == child.name);
            let (node, created) = match existing {
                Some(node) if node.kind != wanted => {
                    return Err(SyncError::KindMismatch {
                        path: child_path,
                        expected: wanted.as_str(),
                        found: node.kind.as_str(),
                    });
                }
                Some(node) => (Some(node.clone()), false),
                None => (self.create(node_id, &child, wanted, &child_path, report)?, true),
            };

            emit(
                self.progress,
                SyncEvent::ContainerReady {
                    path: child_path.clone(),
                    kind: child.kind,
                    created,
                    ignored: child.ignored_entries(),
                },
            );

            match child.kind {
                DirKind::Folder => {
                    let id = node.as_ref().map(|n| n.id.as_str());
                    self.sync_folder(&child, id, &child_path, report)?;
                }
                DirKind::Gallery => {
                    let album_key = match &node {
                        Some(node) => Some(self.album_key(node, &child_path)?),
                        None => None,
                    };
                    gallery::sync_gallery(
                        self.remote,
                        &child,
                        album_key.as_deref(),
                        &child_path,
                        self.opts,
                        self.progress,
                        report,
                    )?;
                }
                DirKind::Empty => {}
            }
        }
        Ok(())
    }

    /// Create the remote node for `child`, or return `None` in a dry run.
    fn create(
        &self,
        parent_id: Option<&str>,
        child: &LocalDir,
        kind: NodeKind,
        path: &str,
        report: &mut SyncReport,
    ) -> Result<Option<Node>, SyncError> {
        match kind {
            NodeKind::Album => report.galleries_created += 1,
            _ => report.folders_created += 1,
        }
        let Some(parent_id) = parent_id.filter(|_| !self.opts.dry_run) else {
            log::debug!("would create {} {path}", kind.as_str());
            return Ok(None);
        };

        let is_album = kind == NodeKind::Album;
        let new = NewNode {
            kind,
            name: child.name.clone(),
            url_name: url_name(&child.name),
            privacy: is_album.then(|| self.opts.privacy.clone()),
            template_uri: if is_album { self.template_uri.clone() } else { None },
        };
        let node = self.remote.create_node(parent_id, &new)?;
        log::info!("created {} {path}", kind.as_str());

        if !is_album && !self.opts.folder_delay.is_zero() {
            log::debug!("waiting {:?} after creating folder {path}", self.opts.folder_delay);
            std::thread::sleep(self.opts.folder_delay);
        }
        Ok(Some(node))
    }

    /// Album key of an album node; listings may omit it, so fall back to
    /// fetching the node itself.
    fn album_key(&self, node: &Node, path: &str) -> Result<String, SyncError> {
        if let Some(key) = &node.album_key {
            return Ok(key.clone());
        }
        self.remote
            .node(&node.id)?
            .album_key
            .ok_or_else(|| SyncError::MissingAlbumKey(path.to_string()))
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
