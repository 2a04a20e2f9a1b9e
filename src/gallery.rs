//! Per-gallery file sync.
//!
//! Syncing one gallery happens in two steps:
//!
//! 1. [`plan_gallery`] compares the local images against the remote album
//!    listing and decides an action per file. Local files are only hashed
//!    when the remote already has a file of the same name; everything else
//!    is decided by name alone.
//! 2. [`apply_plan`] carries the actions out, one transfer at a time.
//!
//! Remote files are matched by exact file name. When the listing holds the
//! same name twice, the first record is the one compared against; the
//! duplicates are left alone.
//!
//! ## Pruning
//!
//! With pruning on, remote files with no local counterpart become deletion
//! candidates. If they make up more than `delete_threshold` of the remote
//! album, nothing is deleted: a local directory that was half-emptied by
//! accident should not empty the gallery with it.

use crate::digest;
use crate::reconcile::{FileStatus, SyncError, SyncEvent, SyncOptions, SyncReport, emit};
use crate::remote::{Remote, RemoteError, RemoteImage, Upload};
use crate::scan::{LocalDir, LocalImage};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::mpsc::Sender;

/// What to do with one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// Not on the remote yet.
    Upload(LocalImage),
    /// On the remote with different content.
    Replace { local: LocalImage, remote: RemoteImage },
    /// Identical on both sides.
    Skip(LocalImage),
    /// Only on the remote, and pruning is allowed to remove it.
    Delete(RemoteImage),
}

/// The decided actions for one gallery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryPlan {
    /// Local files in name order, followed by deletions.
    pub actions: Vec<FileAction>,
    /// Number of records in the remote listing.
    pub remote_total: usize,
    /// Remote-only files that will stay on the remote.
    pub remote_only_kept: usize,
    /// Deletion candidates held back by the threshold.
    pub suppressed: usize,
}

impl GalleryPlan {
    /// Local files the plan touches (everything but deletions).
    pub fn local_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| !matches!(a, FileAction::Delete(_)))
            .count()
    }

    /// How many images the album should hold once the plan is applied.
    pub fn expected_remote_count(&self) -> usize {
        self.local_count() + self.remote_only_kept
    }
}

/// Decide the action for every file of a gallery.
///
/// `prune_threshold` is `None` when pruning is off; otherwise it is the
/// largest share of the remote album that may be deleted. Exceeding it
/// (strictly) suppresses every deletion for this gallery.
pub fn plan_gallery(
    local: &[LocalImage],
    remote: &[RemoteImage],
    prune_threshold: Option<f64>,
    hash: impl Fn(&Path) -> io::Result<String>,
) -> io::Result<GalleryPlan> {
    let mut by_name: HashMap<&str, &RemoteImage> = HashMap::new();
    for image in remote {
        by_name.entry(image.file_name.as_str()).or_insert(image);
    }

    let mut actions = Vec::with_capacity(local.len());
    for image in local {
        let action = match by_name.get(image.name.as_str()) {
            None => FileAction::Upload(image.clone()),
            Some(existing) => {
                let local_md5 = hash(&image.path)?;
                let same = existing
                    .md5
                    .as_deref()
                    .is_some_and(|remote_md5| remote_md5.eq_ignore_ascii_case(&local_md5));
                if same {
                    FileAction::Skip(image.clone())
                } else {
                    FileAction::Replace {
                        local: image.clone(),
                        remote: (*existing).clone(),
                    }
                }
            }
        };
        actions.push(action);
    }

    let local_names: HashSet<&str> = local.iter().map(|i| i.name.as_str()).collect();
    let candidates: Vec<&RemoteImage> = remote
        .iter()
        .filter(|r| !local_names.contains(r.file_name.as_str()))
        .collect();

    let mut plan = GalleryPlan {
        actions,
        remote_total: remote.len(),
        remote_only_kept: candidates.len(),
        suppressed: 0,
    };

    if let Some(threshold) = prune_threshold
        && !candidates.is_empty()
    {
        let share = candidates.len() as f64 / remote.len() as f64;
        if share > threshold {
            plan.suppressed = candidates.len();
        } else {
            plan.remote_only_kept = 0;
            plan.actions
                .extend(candidates.into_iter().cloned().map(FileAction::Delete));
        }
    }

    Ok(plan)
}

/// Sync one gallery directory into an album.
///
/// `album_key` is `None` for an album that does not exist yet (dry run):
/// every local file is then planned as a new upload.
pub fn sync_gallery(
    remote: &dyn Remote,
    dir: &LocalDir,
    album_key: Option<&str>,
    path: &str,
    opts: &SyncOptions,
    progress: Option<&Sender<SyncEvent>>,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    let remote_images = match album_key {
        Some(key) => remote.album_images(key)?,
        None => Vec::new(),
    };
    emit(
        progress,
        SyncEvent::GalleryStarted {
            path: path.to_string(),
            local_count: dir.images.len(),
            remote_count: remote_images.len(),
        },
    );

    let threshold = opts.prune.then_some(opts.delete_threshold);
    let plan = plan_gallery(&dir.images, &remote_images, threshold, digest::md5_file)?;

    if plan.suppressed > 0 {
        log::warn!(
            "{path}: {} of {} remote images missing locally, above the {:.0}% delete threshold",
            plan.suppressed,
            plan.remote_total,
            opts.delete_threshold * 100.0
        );
        report.suppressed_galleries += 1;
        emit(
            progress,
            SyncEvent::DeletionSuppressed {
                path: path.to_string(),
                candidates: plan.suppressed,
                remote_total: plan.remote_total,
                threshold: opts.delete_threshold,
            },
        );
    }

    apply_plan(remote, album_key, &plan, opts, progress, report)?;

    if !opts.dry_run
        && let Some(key) = album_key
    {
        let actual = remote.album_images(key)?.len();
        let expected = plan.expected_remote_count();
        if actual != expected {
            log::warn!("{path}: expected {expected} remote images, found {actual}");
            emit(
                progress,
                SyncEvent::CountMismatch {
                    path: path.to_string(),
                    expected,
                    actual,
                },
            );
        }
    }
    Ok(())
}

/// Carry out a plan. In dry-run mode nothing is sent, but the report and
/// the events are produced exactly as for a real run.
pub fn apply_plan(
    remote: &dyn Remote,
    album_key: Option<&str>,
    plan: &GalleryPlan,
    opts: &SyncOptions,
    progress: Option<&Sender<SyncEvent>>,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    let total = plan.local_count();
    let mut index = 0;

    for action in &plan.actions {
        match action {
            FileAction::Skip(local) => {
                index += 1;
                report.unchanged += 1;
                emit(progress, file_event(index, total, local, FileStatus::Unchanged));
            }
            FileAction::Upload(local) => {
                index += 1;
                if !opts.dry_run {
                    transfer(remote, album_key, local, None, opts)?;
                }
                report.uploaded += 1;
                emit(progress, file_event(index, total, local, FileStatus::Uploaded));
            }
            FileAction::Replace { local, remote: existing } => {
                index += 1;
                if !opts.dry_run {
                    let image_uri = existing.image_uri.clone().ok_or_else(|| {
                        RemoteError::Malformed(format!("no image uri for {}", existing.file_name))
                    })?;
                    transfer(remote, album_key, local, Some(image_uri), opts)?;
                }
                report.replaced += 1;
                emit(progress, file_event(index, total, local, FileStatus::Replaced));
            }
            FileAction::Delete(existing) => {
                if !opts.dry_run {
                    remote.delete_image(existing)?;
                }
                report.deleted += 1;
                emit(
                    progress,
                    SyncEvent::FileDeleted {
                        name: existing.file_name.clone(),
                    },
                );
            }
        }
    }
    Ok(())
}

fn file_event(index: usize, total: usize, local: &LocalImage, status: FileStatus) -> SyncEvent {
    SyncEvent::FileSynced {
        index,
        total,
        name: local.name.clone(),
        status,
    }
}

/// Read, hash and send one file, then wait the upload back-off.
fn transfer(
    remote: &dyn Remote,
    album_key: Option<&str>,
    local: &LocalImage,
    replace: Option<String>,
    opts: &SyncOptions,
) -> Result<(), SyncError> {
    let album_key = album_key.ok_or_else(|| SyncError::MissingAlbumKey(local.name.clone()))?;
    let bytes = fs::read(&local.path)?;
    let md5 = digest::md5_hex(&bytes);
    let content_type = mime_guess::from_path(&local.path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    log::debug!(
        "uploading {} ({} bytes, {content_type}, md5 {md5})",
        local.name,
        bytes.len()
    );
    remote.upload(Upload {
        album_key: album_key.to_string(),
        file_name: local.name.clone(),
        bytes,
        md5,
        content_type,
        replace,
    })?;
    if !opts.upload_delay.is_zero() {
        log::debug!("waiting {:?} before the next transfer", opts.upload_delay);
        std::thread::sleep(opts.upload_delay);
    }
    Ok(())
}
