//! Remote photo service: node tree, albums, and uploads.
//!
//! The [`Remote`] trait is the seam between the sync logic and the service.
//! Everything the reconciler needs goes through it, so the whole tree walk
//! can be exercised against the in-memory mock in [`tests`].
//!
//! The production implementation is [`SmugMugClient`], a blocking HTTP
//! client for the SmugMug v2 API with OAuth 1.0a request signing.
//!
//! ## Object Model
//!
//! | Remote object | Local counterpart |
//! |---|---|
//! | Folder node | directory of directories |
//! | Album node (+ album key) | directory of images |
//! | Album image | image file, matched by file name, compared by MD5 |

pub mod client;
mod oauth;
mod wire;

pub use client::SmugMugClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid URL {0}")]
    InvalidUrl(String),
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error("{method} {url} failed with {status}: {message}")]
    Status {
        method: String,
        url: String,
        status: u16,
        message: String,
    },
    #[error("Upload of {file} rejected: {message}")]
    Rejected { file: String, message: String },
    #[error("Unexpected response: {0}")]
    Malformed(String),
}

/// Remote node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Folder,
    Album,
    Page,
    #[serde(other)]
    Other,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Folder => "Folder",
            NodeKind::Album => "Album",
            NodeKind::Page => "Page",
            NodeKind::Other => "Other",
        }
    }
}

/// A node in the remote folder tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    /// Album key, for album nodes whose listing carried it.
    pub album_key: Option<String>,
}

/// An image inside a remote album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImage {
    pub file_name: String,
    /// MD5 of the archived original, when the service has one.
    pub md5: Option<String>,
    /// Album-image URI, used to remove the image from its album.
    pub uri: String,
    /// Image URI, used to replace the image in place.
    pub image_uri: Option<String>,
}

/// Parameters for creating a folder or album node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub kind: NodeKind,
    pub name: String,
    pub url_name: String,
    /// Only sent for albums.
    pub privacy: Option<String>,
    /// Only sent for albums.
    pub template_uri: Option<String>,
}

/// A single file transfer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub album_key: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub md5: String,
    pub content_type: String,
    /// Image URI to overwrite; `None` uploads a new image.
    pub replace: Option<String>,
}

/// A named album template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumTemplate {
    pub name: String,
    pub uri: String,
}

/// Operations the sync needs from the remote service.
///
/// Listing operations follow pagination to the end and return everything.
pub trait Remote {
    /// The authenticated user's root node.
    fn root_node(&self) -> Result<Node, RemoteError>;

    /// Fetch one node by id.
    fn node(&self, id: &str) -> Result<Node, RemoteError>;

    /// All direct children of a node.
    fn children(&self, id: &str) -> Result<Vec<Node>, RemoteError>;

    /// Create a child node and return it.
    fn create_node(&self, parent_id: &str, new: &NewNode) -> Result<Node, RemoteError>;

    /// All images of an album.
    fn album_images(&self, album_key: &str) -> Result<Vec<RemoteImage>, RemoteError>;

    /// Upload a new image or replace an existing one.
    fn upload(&self, upload: Upload) -> Result<(), RemoteError>;

    /// Remove an image from its album.
    fn delete_image(&self, image: &RemoteImage) -> Result<(), RemoteError>;

    /// Album templates available to the user.
    fn album_templates(&self) -> Result<Vec<AlbumTemplate>, RemoteError>;
}

/// Last path segment of a URI such as `/api/v2/album/SJT3DX`.
pub(crate) fn uri_key(uri: &str) -> Option<&str> {
    uri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// In-memory remote tree that records every mutating operation.
    pub struct MockRemote {
        nodes: RefCell<BTreeMap<String, MockNode>>,
        albums: RefCell<BTreeMap<String, Vec<RemoteImage>>>,
        templates: Vec<AlbumTemplate>,
        operations: RefCell<Vec<RecordedOp>>,
        next_id: RefCell<u32>,
        /// Strip album keys from child listings, forcing a `node()` lookup.
        pub hide_album_keys: bool,
        /// Uploads of this file name fail.
        pub failing_upload: Option<String>,
    }

    struct MockNode {
        node: Node,
        children: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        CreateNode {
            parent: String,
            kind: NodeKind,
            name: String,
            url_name: String,
            privacy: Option<String>,
            template_uri: Option<String>,
        },
        Upload {
            album_key: String,
            file_name: String,
            md5: String,
            content_type: String,
            replace: bool,
        },
        Delete {
            file_name: String,
        },
    }

    pub const ROOT_ID: &str = "root";

    impl MockRemote {
        pub fn new() -> Self {
            let root = MockNode {
                node: Node {
                    id: ROOT_ID.to_string(),
                    name: String::new(),
                    kind: NodeKind::Folder,
                    album_key: None,
                },
                children: Vec::new(),
            };
            Self {
                nodes: RefCell::new(BTreeMap::from([(ROOT_ID.to_string(), root)])),
                albums: RefCell::new(BTreeMap::new()),
                templates: Vec::new(),
                operations: RefCell::new(Vec::new()),
                next_id: RefCell::new(0),
                hide_album_keys: false,
                failing_upload: None,
            }
        }

        pub fn with_templates(mut self, templates: &[(&str, &str)]) -> Self {
            self.templates = templates
                .iter()
                .map(|(name, uri)| AlbumTemplate {
                    name: name.to_string(),
                    uri: uri.to_string(),
                })
                .collect();
            self
        }

        /// Add a folder under `parent`, returning its node id.
        pub fn add_folder(&self, parent: &str, name: &str) -> String {
            self.insert_node(parent, name, NodeKind::Folder).id
        }

        /// Add an album under `parent`, returning its album key.
        pub fn add_album(&self, parent: &str, name: &str) -> String {
            self.insert_node(parent, name, NodeKind::Album)
                .album_key
                .expect("album nodes carry a key")
        }

        /// Add a page node (neither folder nor album).
        pub fn add_page(&self, parent: &str, name: &str) -> String {
            self.insert_node(parent, name, NodeKind::Page).id
        }

        /// Add an image to an album with an explicit MD5.
        pub fn add_image(&self, album_key: &str, file_name: &str, md5: &str) {
            let image = self.make_image(album_key, file_name, Some(md5.to_string()));
            self.albums
                .borrow_mut()
                .entry(album_key.to_string())
                .or_default()
                .push(image);
        }

        /// Current images of an album, by file name.
        pub fn image_names(&self, album_key: &str) -> Vec<String> {
            self.albums
                .borrow()
                .get(album_key)
                .map(|imgs| imgs.iter().map(|i| i.file_name.clone()).collect())
                .unwrap_or_default()
        }

        /// Find a node by its path of names from the root.
        pub fn find_path(&self, path: &[&str]) -> Option<Node> {
            let nodes = self.nodes.borrow();
            let mut current = ROOT_ID.to_string();
            for name in path {
                let parent = nodes.get(&current)?;
                current = parent
                    .children
                    .iter()
                    .find(|id| nodes[*id].node.name == *name)?
                    .clone();
            }
            Some(nodes[&current].node.clone())
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.borrow().clone()
        }

        fn insert_node(&self, parent: &str, name: &str, kind: NodeKind) -> Node {
            let id = {
                let mut next = self.next_id.borrow_mut();
                *next += 1;
                format!("n{}", *next)
            };
            let node = Node {
                id: id.clone(),
                name: name.to_string(),
                kind,
                album_key: (kind == NodeKind::Album).then(|| format!("album-{id}")),
            };
            if let Some(key) = &node.album_key {
                self.albums.borrow_mut().entry(key.clone()).or_default();
            }
            let mut nodes = self.nodes.borrow_mut();
            nodes
                .get_mut(parent)
                .expect("parent node exists")
                .children
                .push(id.clone());
            nodes.insert(
                id,
                MockNode {
                    node: node.clone(),
                    children: Vec::new(),
                },
            );
            node
        }

        fn make_image(&self, album_key: &str, file_name: &str, md5: Option<String>) -> RemoteImage {
            RemoteImage {
                file_name: file_name.to_string(),
                md5,
                uri: format!("/api/v2/album/{album_key}/image/{file_name}"),
                image_uri: Some(format!("/api/v2/image/{album_key}-{file_name}")),
            }
        }

        fn not_found(what: &str) -> RemoteError {
            RemoteError::Status {
                method: "GET".to_string(),
                url: what.to_string(),
                status: 404,
                message: "Not Found".to_string(),
            }
        }
    }

    impl Remote for MockRemote {
        fn root_node(&self) -> Result<Node, RemoteError> {
            self.node(ROOT_ID)
        }

        fn node(&self, id: &str) -> Result<Node, RemoteError> {
            self.nodes
                .borrow()
                .get(id)
                .map(|n| n.node.clone())
                .ok_or_else(|| Self::not_found(id))
        }

        fn children(&self, id: &str) -> Result<Vec<Node>, RemoteError> {
            let nodes = self.nodes.borrow();
            let parent = nodes.get(id).ok_or_else(|| Self::not_found(id))?;
            Ok(parent
                .children
                .iter()
                .map(|child| {
                    let mut node = nodes[child].node.clone();
                    if self.hide_album_keys {
                        node.album_key = None;
                    }
                    node
                })
                .collect())
        }

        fn create_node(&self, parent_id: &str, new: &NewNode) -> Result<Node, RemoteError> {
            if !self.nodes.borrow().contains_key(parent_id) {
                return Err(Self::not_found(parent_id));
            }
            self.operations.borrow_mut().push(RecordedOp::CreateNode {
                parent: parent_id.to_string(),
                kind: new.kind,
                name: new.name.clone(),
                url_name: new.url_name.clone(),
                privacy: new.privacy.clone(),
                template_uri: new.template_uri.clone(),
            });
            Ok(self.insert_node(parent_id, &new.name, new.kind))
        }

        fn album_images(&self, album_key: &str) -> Result<Vec<RemoteImage>, RemoteError> {
            self.albums
                .borrow()
                .get(album_key)
                .cloned()
                .ok_or_else(|| Self::not_found(album_key))
        }

        fn upload(&self, upload: Upload) -> Result<(), RemoteError> {
            self.operations.borrow_mut().push(RecordedOp::Upload {
                album_key: upload.album_key.clone(),
                file_name: upload.file_name.clone(),
                md5: upload.md5.clone(),
                content_type: upload.content_type.clone(),
                replace: upload.replace.is_some(),
            });
            if self.failing_upload.as_deref() == Some(upload.file_name.as_str()) {
                return Err(RemoteError::Rejected {
                    file: upload.file_name,
                    message: "system error".to_string(),
                });
            }
            let image = self.make_image(&upload.album_key, &upload.file_name, Some(upload.md5));
            let mut albums = self.albums.borrow_mut();
            let images = albums
                .get_mut(&upload.album_key)
                .ok_or_else(|| Self::not_found(&upload.album_key))?;
            match upload.replace {
                Some(uri) => {
                    let existing = images
                        .iter_mut()
                        .find(|i| i.image_uri.as_deref() == Some(uri.as_str()))
                        .ok_or_else(|| Self::not_found(&uri))?;
                    *existing = image;
                }
                None => images.push(image),
            }
            Ok(())
        }

        fn delete_image(&self, image: &RemoteImage) -> Result<(), RemoteError> {
            self.operations.borrow_mut().push(RecordedOp::Delete {
                file_name: image.file_name.clone(),
            });
            for images in self.albums.borrow_mut().values_mut() {
                if let Some(pos) = images.iter().position(|i| i.uri == image.uri) {
                    images.remove(pos);
                    return Ok(());
                }
            }
            Err(Self::not_found(&image.uri))
        }

        fn album_templates(&self) -> Result<Vec<AlbumTemplate>, RemoteError> {
            Ok(self.templates.clone())
        }
    }

    #[test]
    fn uri_key_takes_last_segment() {
        assert_eq!(uri_key("/api/v2/album/SJT3DX"), Some("SJT3DX"));
        assert_eq!(uri_key("/api/v2/node/XWx8t/"), Some("XWx8t"));
        assert_eq!(uri_key(""), None);
    }

    #[test]
    fn node_kind_parses_unknown_types() {
        let kind: NodeKind = serde_json::from_str("\"System Album\"").unwrap();
        assert_eq!(kind, NodeKind::Other);
        let kind: NodeKind = serde_json::from_str("\"Album\"").unwrap();
        assert_eq!(kind, NodeKind::Album);
    }

    #[test]
    fn mock_builds_and_finds_tree() {
        let remote = MockRemote::new();
        let travel = remote.add_folder(ROOT_ID, "Travel");
        let key = remote.add_album(&travel, "Japan");
        remote.add_image(&key, "1.jpg", "abc");

        let japan = remote.find_path(&["Travel", "Japan"]).unwrap();
        assert_eq!(japan.kind, NodeKind::Album);
        assert_eq!(japan.album_key.as_deref(), Some(key.as_str()));
        assert_eq!(remote.image_names(&key), vec!["1.jpg"]);
        assert!(remote.get_operations().is_empty());
    }

    #[test]
    fn mock_records_upload_and_replace() {
        let remote = MockRemote::new();
        let key = remote.add_album(ROOT_ID, "A");
        remote.add_image(&key, "1.jpg", "old");
        let existing = remote.album_images(&key).unwrap().remove(0);

        remote
            .upload(Upload {
                album_key: key.clone(),
                file_name: "1.jpg".into(),
                bytes: vec![1],
                md5: "new".into(),
                content_type: "image/jpeg".into(),
                replace: existing.image_uri.clone(),
            })
            .unwrap();

        let images = remote.album_images(&key).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].md5.as_deref(), Some("new"));
        assert!(matches!(
            &remote.get_operations()[0],
            RecordedOp::Upload { replace: true, .. }
        ));
    }

    #[test]
    fn mock_hides_album_keys_in_listing() {
        let mut remote = MockRemote::new();
        remote.hide_album_keys = true;
        remote.add_album(ROOT_ID, "A");

        let children = remote.children(ROOT_ID).unwrap();
        assert_eq!(children[0].album_key, None);
        assert!(remote.node(&children[0].id).unwrap().album_key.is_some());
    }
}
