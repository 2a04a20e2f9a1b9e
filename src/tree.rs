//! Walking the remote node tree by name.

use crate::reconcile::SyncError;
use crate::remote::{Node, NodeKind, Remote};

/// The first child of `parent_id` whose name matches exactly.
pub fn find_child(
    remote: &dyn Remote,
    parent_id: &str,
    name: &str,
) -> Result<Option<Node>, SyncError> {
    let children = remote.children(parent_id)?;
    Ok(children.into_iter().find(|child| child.name == name))
}

/// Resolve a slash-separated destination path from the user's root node.
///
/// Empty segments are ignored, so `""`, `"/"` and `"A//B/"` are all valid.
/// The resolved node must be a folder.
pub fn resolve_path(remote: &dyn Remote, path: &str) -> Result<Node, SyncError> {
    let mut node = remote.root_node()?;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        node = find_child(remote, &node.id, segment)?
            .ok_or_else(|| SyncError::DestinationNotFound(path.to_string()))?;
    }
    if node.kind != NodeKind::Folder {
        return Err(SyncError::DestinationNotFolder {
            path: path.to_string(),
            kind: node.kind.as_str(),
        });
    }
    log::debug!("destination {path:?} resolved to node {}", node.id);
    Ok(node)
}
