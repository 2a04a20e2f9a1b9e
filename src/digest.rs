//! Content hashing for change detection.
//!
//! The remote service stores the MD5 of every original it archives
//! (`ArchivedMD5`) and expects a `Content-MD5` header on uploads, so MD5 is
//! the digest used to decide whether a local file differs from its remote
//! copy. Content-based rather than mtime-based: a re-exported file with the
//! same pixels is not re-uploaded, and a touched file is not either.

use md5::{Digest, Md5};
use std::io;
use std::path::Path;

/// MD5 of a byte slice, returned as a lower-case hex string.
pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// MD5 of a file's contents, returned as a lower-case hex string.
pub fn md5_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(md5_hex(&bytes))
}
