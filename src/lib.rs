//! # smugsync
//!
//! One-way sync of a local photo directory tree into a SmugMug account.
//! Your filesystem is the source of truth: directories of directories become
//! folders, directories of images become galleries, and image files are
//! uploaded into their gallery when they are new or their content changed.
//!
//! # Architecture: Scan, Reconcile, Diff
//!
//! ```text
//! 1. Scan        Photos/Travel/Japan/   →  Gallery (3 images)
//! 2. Reconcile   Travel/Japan           →  remote Folder/Album (matched or created)
//! 3. Diff        3 local vs 2 remote    →  upload / replace / skip / delete
//! ```
//!
//! The remote service sits behind the [`remote::Remote`] trait. The whole
//! walk, including the diff and the pruning threshold, runs against an
//! in-memory mock in the unit tests; only [`remote::SmugMugClient`] speaks
//! HTTP.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Classifies local directories as folder, gallery, or empty |
//! | [`tree`] | Finds remote nodes by name and resolves the destination path |
//! | [`reconcile`] | Walks both trees in lock-step, creating missing containers |
//! | [`gallery`] | Per-gallery diff by MD5 and the guarded prune |
//! | [`remote`] | The remote seam, the SmugMug client, and OAuth signing |
//! | [`config`] | `smugsync.toml` loading, environment overlay, validation |
//! | [`naming`] | URL-safe names for new remote nodes |
//! | [`digest`] | MD5 content hashing |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Local Wins, Nothing Else
//!
//! The sync never downloads, never merges, and never removes a remote
//! container. A remote node of the wrong type stops the run so that the
//! user decides what happens to it.
//!
//! ## MD5 Because the Service Stores It
//!
//! The remote keeps the MD5 of every archived original. Comparing against
//! it costs no extra request, and files are only read and hashed when the
//! remote already has a file of that name.
//!
//! ## Abort on First Error
//!
//! There is no partial-failure recovery. Because unchanged files are
//! skipped by hash, re-running after a failure resumes the work.

pub mod config;
pub mod digest;
pub mod gallery;
pub mod naming;
pub mod output;
pub mod reconcile;
pub mod remote;
pub mod scan;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;
