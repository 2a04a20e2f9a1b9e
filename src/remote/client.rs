//! Blocking HTTP client for the SmugMug v2 API.
//!
//! Every request is signed with OAuth 1.0a and asks for JSON. Listings are
//! paginated with `start`/`count`; [`Pages`] walks them one request at a
//! time until the response stops announcing a `NextPage`.
//!
//! Uploads go to a separate endpoint that takes the raw image bytes as the
//! body and describes the target with `X-Smug-*` headers. Setting
//! `X-Smug-ImageUri` turns an upload into an in-place replacement.

use super::oauth::{self, Credentials};
use super::wire::{
    self, WireAlbum, WireAlbumImage, WireNode, WireTemplate, WireUploadResponse, WireUser,
};
use super::{AlbumTemplate, NewNode, Node, NodeKind, Remote, RemoteError, RemoteImage, Upload};
use crate::config::{ApiConfig, AuthConfig};
use reqwest::Method;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cell::OnceCell;
use std::marker::PhantomData;
use std::time::Duration;

const API_PREFIX: &str = "/api/v2";

pub struct SmugMugClient {
    http: Client,
    creds: Credentials,
    base_url: String,
    upload_url: String,
    page_size: u32,
    user: OnceCell<WireUser>,
}

impl SmugMugClient {
    pub fn new(api: &ApiConfig, auth: &AuthConfig) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(concat!("smugsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            creds: Credentials {
                consumer_key: auth.api_key.clone(),
                consumer_secret: auth.api_secret.clone(),
                token: auth.access_token.clone(),
                token_secret: auth.access_token_secret.clone(),
            },
            base_url: api.base_url.trim_end_matches('/').to_string(),
            upload_url: api.upload_url.clone(),
            page_size: api.page_size,
            user: OnceCell::new(),
        })
    }

    /// Names of every album in the account.
    pub fn album_names(&self) -> Result<Vec<String>, RemoteError> {
        let nick = self.user()?.nick_name;
        let albums: Vec<WireAlbum> = self.collect(&format!("/user/{nick}!albums"), "Album")?;
        Ok(albums.into_iter().map(|a| a.name).collect())
    }

    /// The authenticated user, fetched once.
    fn user(&self) -> Result<WireUser, RemoteError> {
        if let Some(user) = self.user.get() {
            return Ok(user.clone());
        }
        let mut envelope = self.get("!authuser", &[])?;
        let user: WireUser = wire::take_object(&mut envelope, "User")?;
        log::debug!("authenticated as {}", user.nick_name);
        let _ = self.user.set(user.clone());
        Ok(user)
    }

    fn api_url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, RemoteError> {
        let raw = format!("{}{}{}", self.base_url, API_PREFIX, path);
        let mut url = Url::parse(&raw).map_err(|e| RemoteError::InvalidUrl(format!("{raw}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Resolve a URI returned by the API (`/api/v2/...`) against the host.
    fn uri_url(&self, uri: &str) -> Result<Url, RemoteError> {
        let raw = if uri.starts_with('/') {
            format!("{}{}", self.base_url, uri)
        } else {
            uri.to_string()
        };
        Url::parse(&raw).map_err(|e| RemoteError::InvalidUrl(format!("{raw}: {e}")))
    }

    fn signed(&self, method: Method, url: Url) -> Result<RequestBuilder, RemoteError> {
        let auth = oauth::authorization_header(&self.creds, method.as_str(), &url)?;
        log::debug!("{method} {url}");
        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, auth)
            .header(ACCEPT, "application/json"))
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, RemoteError> {
        let url = self.api_url(path, query)?;
        let response = self.signed(Method::GET, url.clone())?.send()?;
        read_json(response, "GET", &url)
    }

    fn collect<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &'static str,
    ) -> Result<Vec<T>, RemoteError> {
        collect_pages(Pages::new(self.page_size, |start| {
            self.fetch_page::<T>(path, key, start)
        }))
    }

    fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        start: u32,
    ) -> Result<(Vec<T>, bool), RemoteError> {
        let query = [("start", start.to_string()), ("count", self.page_size.to_string())];
        let mut envelope = self.get(path, &query)?;
        let more = wire::has_next_page(&envelope);
        let items: Vec<T> = wire::take_list(&mut envelope, key)?;
        log::debug!("{path} page at {start}: {} items", items.len());
        Ok((items, more))
    }
}

/// Lazily fetched pages of a listing.
///
/// `fetch` is called with the 1-based `start` of each page and returns the
/// page's items plus whether the response announced a next page. Paging
/// stops after the first error, after a page without a `NextPage`, or after
/// an empty page.
pub struct Pages<T, F> {
    fetch: F,
    page_size: u32,
    start: Option<u32>,
    phan: PhantomData<T>,
}

impl<T, F> Pages<T, F>
where
    F: FnMut(u32) -> Result<(Vec<T>, bool), RemoteError>,
{
    pub fn new(page_size: u32, fetch: F) -> Self {
        Self {
            fetch,
            page_size,
            start: Some(1),
            phan: PhantomData,
        }
    }
}

impl<T, F> Iterator for Pages<T, F>
where
    F: FnMut(u32) -> Result<(Vec<T>, bool), RemoteError>,
{
    type Item = Result<Vec<T>, RemoteError>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.start?;
        match (self.fetch)(start) {
            Ok((items, more)) => {
                self.start = next_start(start, self.page_size, more, items.len());
                Some(Ok(items))
            }
            Err(err) => {
                self.start = None;
                Some(Err(err))
            }
        }
    }
}

/// Start of the page after the one at `start`, if there is one.
fn next_start(start: u32, page_size: u32, more: bool, len: usize) -> Option<u32> {
    (more && len > 0).then(|| start + page_size)
}

/// Concatenate every page, stopping at the first error.
fn collect_pages<T>(
    pages: impl Iterator<Item = Result<Vec<T>, RemoteError>>,
) -> Result<Vec<T>, RemoteError> {
    let mut all = Vec::new();
    for page in pages {
        all.extend(page?);
    }
    Ok(all)
}

fn read_json(response: Response, method: &str, url: &Url) -> Result<Value, RemoteError> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(RemoteError::Status {
            method: method.to_string(),
            url: url.to_string(),
            status: status.as_u16(),
            message: wire::error_message(&body).unwrap_or(body),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, RemoteError> {
    HeaderValue::from_bytes(value.as_bytes()).map_err(|_| RemoteError::InvalidHeader(name))
}

/// Headers describing an upload to the upload endpoint.
fn upload_headers(upload: &Upload) -> Result<HeaderMap, RemoteError> {
    let mut headers = HeaderMap::new();
    let mut put = |name: &'static str, value: &str| -> Result<(), RemoteError> {
        headers.insert(HeaderName::from_static(name), header_value(name, value)?);
        Ok(())
    };
    put("x-smug-albumuri", &format!("{API_PREFIX}/album/{}", upload.album_key))?;
    put("x-smug-version", "v2")?;
    put("x-smug-responsetype", "JSON")?;
    put("x-smug-filename", &upload.file_name)?;
    put("content-md5", &upload.md5)?;
    if let Some(image_uri) = &upload.replace {
        put("x-smug-imageuri", image_uri)?;
    }
    headers.insert(CONTENT_TYPE, header_value("content-type", &upload.content_type)?);
    Ok(headers)
}

/// Map the upload endpoint's `stat` field onto a result.
fn upload_outcome(file: String, response: WireUploadResponse) -> Result<(), RemoteError> {
    if response.stat == "ok" {
        return Ok(());
    }
    Err(RemoteError::Rejected {
        file,
        message: match (response.code, response.message) {
            (Some(code), Some(message)) => format!("{message} (code {code})"),
            (None, Some(message)) => message,
            _ => response.stat,
        },
    })
}

/// JSON body for a node creation request.
fn new_node_body(new: &NewNode) -> Value {
    let mut body = Map::new();
    body.insert("Type".into(), Value::from(new.kind.as_str()));
    body.insert("Name".into(), Value::from(new.name.as_str()));
    body.insert("UrlName".into(), Value::from(new.url_name.as_str()));
    if new.kind == NodeKind::Album {
        if let Some(privacy) = &new.privacy {
            body.insert("Privacy".into(), Value::from(privacy.as_str()));
        }
        if let Some(template) = &new.template_uri {
            body.insert("AlbumTemplateUri".into(), Value::from(template.as_str()));
        }
    }
    Value::Object(body)
}

impl Remote for SmugMugClient {
    fn root_node(&self) -> Result<Node, RemoteError> {
        let user = self.user()?;
        let id = user.root_node_id()?;
        self.node(id)
    }

    fn node(&self, id: &str) -> Result<Node, RemoteError> {
        let mut envelope = self.get(&format!("/node/{id}"), &[])?;
        let node: WireNode = wire::take_object(&mut envelope, "Node")?;
        Ok(node.into())
    }

    fn children(&self, id: &str) -> Result<Vec<Node>, RemoteError> {
        let nodes: Vec<WireNode> = self.collect(&format!("/node/{id}!children"), "Node")?;
        Ok(nodes.into_iter().map(Node::from).collect())
    }

    fn create_node(&self, parent_id: &str, new: &NewNode) -> Result<Node, RemoteError> {
        let url = self.api_url(&format!("/node/{parent_id}!children"), &[])?;
        let response = self
            .signed(Method::POST, url.clone())?
            .json(&new_node_body(new))
            .send()?;
        let mut envelope = read_json(response, "POST", &url)?;
        let node: WireNode = wire::take_object(&mut envelope, "Node")?;
        Ok(node.into())
    }

    fn album_images(&self, album_key: &str) -> Result<Vec<RemoteImage>, RemoteError> {
        let images: Vec<WireAlbumImage> =
            self.collect(&format!("/album/{album_key}!images"), "AlbumImage")?;
        Ok(images.into_iter().map(RemoteImage::from).collect())
    }

    fn upload(&self, upload: Upload) -> Result<(), RemoteError> {
        let url = Url::parse(&self.upload_url)
            .map_err(|e| RemoteError::InvalidUrl(format!("{}: {e}", self.upload_url)))?;
        let headers = upload_headers(&upload)?;
        let response = self
            .signed(Method::POST, url.clone())?
            .headers(headers)
            .body(upload.bytes)
            .send()?;
        let envelope = read_json(response, "POST", &url)?;
        let result: WireUploadResponse = serde_json::from_value(envelope)?;
        upload_outcome(upload.file_name, result)
    }

    fn delete_image(&self, image: &RemoteImage) -> Result<(), RemoteError> {
        let url = self.uri_url(&image.uri)?;
        let response = self.signed(Method::DELETE, url.clone())?.send()?;
        read_json(response, "DELETE", &url)?;
        Ok(())
    }

    fn album_templates(&self) -> Result<Vec<AlbumTemplate>, RemoteError> {
        let nick = self.user()?.nick_name;
        let templates: Vec<WireTemplate> =
            self.collect(&format!("/user/{nick}!albumtemplates"), "AlbumTemplate")?;
        Ok(templates.into_iter().map(AlbumTemplate::from).collect())
    }
}
