//! JSON shapes of the SmugMug v2 API.
//!
//! Every API response wraps its payload in an envelope:
//!
//! ```json
//! { "Code": 200, "Message": "Ok", "Response": { "Node": [...], "Pages": {...} } }
//! ```
//!
//! Only the fields the sync reads are modelled.

use super::{AlbumTemplate, Node, NodeKind, RemoteError, RemoteImage, uri_key};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct WireUri {
    #[serde(rename = "Uri")]
    pub uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireNode {
    #[serde(rename = "NodeID")]
    pub node_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub uris: WireNodeUris,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireNodeUris {
    pub album: Option<WireUri>,
}

impl From<WireNode> for Node {
    fn from(wire: WireNode) -> Self {
        let album_key = match wire.kind {
            NodeKind::Album => wire
                .uris
                .album
                .as_ref()
                .and_then(|a| uri_key(&a.uri))
                .map(str::to_string),
            _ => None,
        };
        Node {
            id: wire.node_id,
            name: wire.name,
            kind: wire.kind,
            album_key,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireAlbumImage {
    pub file_name: String,
    #[serde(rename = "ArchivedMD5", default)]
    pub archived_md5: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub uris: WireImageUris,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireImageUris {
    pub image: Option<WireUri>,
}

impl From<WireAlbumImage> for RemoteImage {
    fn from(wire: WireAlbumImage) -> Self {
        RemoteImage {
            file_name: wire.file_name,
            md5: wire.archived_md5.filter(|h| !h.is_empty()),
            uri: wire.uri,
            image_uri: wire.uris.image.map(|u| u.uri),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireUser {
    pub nick_name: String,
    pub uris: WireUserUris,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireUserUris {
    pub node: WireUserNodeUri,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireUserNodeUri {
    #[serde(rename = "Uri")]
    pub uri: String,
}

impl WireUser {
    pub fn root_node_id(&self) -> Result<&str, RemoteError> {
        uri_key(&self.uris.node.uri)
            .ok_or_else(|| RemoteError::Malformed(format!("user node uri {}", self.uris.node.uri)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireTemplate {
    pub name: String,
    pub uri: String,
}

impl From<WireTemplate> for AlbumTemplate {
    fn from(wire: WireTemplate) -> Self {
        AlbumTemplate {
            name: wire.name,
            uri: wire.uri,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireAlbum {
    pub name: String,
}

/// Body returned by the upload endpoint (lower-case keys, unlike the API).
#[derive(Debug, Deserialize)]
pub struct WireUploadResponse {
    pub stat: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

/// Take `Response.<key>` out of an envelope as a single object.
pub fn take_object<T: DeserializeOwned>(envelope: &mut Value, key: &str) -> Result<T, RemoteError> {
    let value = envelope
        .get_mut("Response")
        .and_then(|r| r.get_mut(key))
        .map(Value::take)
        .ok_or_else(|| RemoteError::Malformed(format!("missing Response.{key}")))?;
    Ok(serde_json::from_value(value)?)
}

/// Take `Response.<key>` out of an envelope as a list; absent means empty.
pub fn take_list<T: DeserializeOwned>(
    envelope: &mut Value,
    key: &str,
) -> Result<Vec<T>, RemoteError> {
    match envelope
        .get_mut("Response")
        .and_then(|r| r.get_mut(key))
        .map(Value::take)
    {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// Whether the envelope announces another page.
pub fn has_next_page(envelope: &Value) -> bool {
    envelope
        .get("Response")
        .and_then(|r| r.get("Pages"))
        .and_then(|p| p.get("NextPage"))
        .is_some_and(|next| !next.is_null())
}

/// Error message carried by an error envelope, if any.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("Message")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
