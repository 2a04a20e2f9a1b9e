//! OAuth 1.0a request signing (HMAC-SHA1, `Authorization` header).
//!
//! The signature base string covers the method, the normalized URL, and
//! every query parameter plus the `oauth_*` protocol parameters. Request
//! bodies (JSON payloads, image bytes) are not form-encoded and therefore
//! never part of the signature.

use super::RemoteError;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use rand::{Rng, distributions::Alphanumeric};
use reqwest::Url;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const VERSION: &str = "1.0";

/// Consumer and access-token credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

/// Build the `Authorization` header for a request with a fresh nonce.
pub fn authorization_header(
    creds: &Credentials,
    method: &str,
    url: &Url,
) -> Result<String, RemoteError> {
    let nonce: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    header_with(creds, method, url, &nonce, timestamp)
}

/// Deterministic header construction.
fn header_with(
    creds: &Credentials,
    method: &str,
    url: &Url,
    nonce: &str,
    timestamp: u64,
) -> Result<String, RemoteError> {
    let timestamp = timestamp.to_string();
    let protocol = protocol_params(creds, nonce, &timestamp);
    let base = base_string(method, url, &protocol);
    let signature = sign(creds, &base)?;

    let mut fields: Vec<String> = protocol
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, encode(v)))
        .collect();
    fields.push(format!("oauth_signature=\"{}\"", encode(&signature)));
    fields.sort();
    Ok(format!("OAuth {}", fields.join(", ")))
}

fn protocol_params<'a>(
    creds: &'a Credentials,
    nonce: &'a str,
    timestamp: &'a str,
) -> Vec<(&'static str, &'a str)> {
    vec![
        ("oauth_consumer_key", creds.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp),
        ("oauth_token", creds.token.as_str()),
        ("oauth_version", VERSION),
    ]
}

/// `METHOD&encoded-url&encoded-parameter-string`.
fn base_string(method: &str, url: &Url, protocol: &[(&str, &str)]) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .collect();
    params.extend(protocol.iter().map(|(k, v)| (encode(k), encode(v))));
    params.sort();

    let param_string = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let normalized_url = format!("{}{}", url.origin().ascii_serialization(), url.path());

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&normalized_url),
        encode(&param_string)
    )
}

fn sign(creds: &Credentials, base: &str) -> Result<String, RemoteError> {
    let key = format!(
        "{}&{}",
        encode(&creds.consumer_secret),
        encode(&creds.token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|_| RemoteError::InvalidHeader("Authorization"))?;
    mac.update(base.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// RFC 3986 percent-encoding: everything but `A-Z a-z 0-9 - . _ ~`.
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}
