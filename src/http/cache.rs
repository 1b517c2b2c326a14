//! HTTP cache control module
//!
//! Last-Modified / `ETag` generation and conditional request evaluation.
//!
//! Two behaviours differ from RFC 7232 on purpose and are relied on by clients
//! of this server:
//! - `If-Modified-Since` only matches when it is byte-for-byte the
//!   `Last-Modified` value we would send. A later date is not a match.
//! - The `ETag` is derived from the modification time alone, so two files with
//!   the same mtime share an `ETag` regardless of content.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use std::fs::Metadata;
use std::time::{Duration, SystemTime};

/// IMF-fixdate layout from RFC 7231 section 7.1.1.1
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Largest accepted `max_age`: ten years
pub const MAX_AGE_LIMIT: u64 = 10 * 365 * 24 * 60 * 60;

/// Filesystem facts the cache decision depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// `None` when the platform cannot report a modification time
    pub modified: Option<SystemTime>,
    /// Length at stat time, the most a read of this file will return
    pub size: u64,
}

impl From<&Metadata> for FileMetadata {
    fn from(meta: &Metadata) -> Self {
        Self {
            modified: meta.modified().ok(),
            size: meta.len(),
        }
    }
}

/// Conditional request headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHeaders {
    pub if_modified_since: Option<String>,
    pub if_none_match: Option<String>,
}

impl ConditionalHeaders {
    /// Extract conditional headers (header names are case-insensitive)
    pub fn from_header_map(headers: &hyper::HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            if_modified_since: get("if-modified-since"),
            if_none_match: get("if-none-match"),
        }
    }
}

/// `Expires` and `Cache-Control` values for a cacheable asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    pub expires: String,
    pub cache_control: String,
}

/// Headers sent with a full response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshHeaders {
    pub last_modified: String,
    pub etag: String,
    pub expiry: Option<Expiry>,
}

/// Outcome of evaluating a request against a file's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
    /// Client copy is stale or absent: send the body with these headers
    Fresh(FreshHeaders),
    /// Client copy is current: send 304
    NotModified,
    /// Metadata needed for the decision is unavailable
    Error(String),
}

/// Expiry rules applied to fresh responses
#[derive(Debug, Clone)]
pub struct CachePolicy {
    max_age: u64,
    extensions: Vec<String>,
}

impl CachePolicy {
    pub fn new(max_age: u64, extensions: &[String]) -> Self {
        Self {
            max_age,
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    /// Whether responses for this extension carry `Expires` / `Cache-Control`
    pub fn is_cacheable(&self, extension: Option<&str>) -> bool {
        extension.is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            self.extensions.iter().any(|e| *e == ext)
        })
    }

    /// Decide how to answer a request for a file, as of now
    pub fn evaluate(
        &self,
        meta: &FileMetadata,
        headers: &ConditionalHeaders,
        extension: Option<&str>,
    ) -> CacheDecision {
        self.evaluate_at(meta, headers, extension, SystemTime::now())
    }

    /// Decide how to answer a request for a file, with `now` as the clock
    ///
    /// Checks run in order and the first match wins:
    /// `If-Modified-Since`, then `If-None-Match`, then a fresh response.
    pub fn evaluate_at(
        &self,
        meta: &FileMetadata,
        headers: &ConditionalHeaders,
        extension: Option<&str>,
        now: SystemTime,
    ) -> CacheDecision {
        let Some(modified) = meta.modified else {
            return CacheDecision::Error("modification time unavailable".to_string());
        };

        let Some(last_modified) = http_date(modified) else {
            return CacheDecision::Error("modification time out of range".to_string());
        };
        if headers.if_modified_since.as_deref() == Some(last_modified.as_str()) {
            return CacheDecision::NotModified;
        }

        let etag = generate_etag(&last_modified);
        if headers.if_none_match.as_deref() == Some(etag.as_str()) {
            return CacheDecision::NotModified;
        }

        let expiry = if self.is_cacheable(extension) {
            let Some(expires) = now
                .checked_add(Duration::from_secs(self.max_age))
                .and_then(http_date)
            else {
                return CacheDecision::Error(format!(
                    "expiry of {}s from now is out of range",
                    self.max_age
                ));
            };
            Some(Expiry {
                expires,
                cache_control: format!("max-age={}", self.max_age),
            })
        } else {
            None
        };

        CacheDecision::Fresh(FreshHeaders {
            last_modified,
            etag,
            expiry,
        })
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_age: 60,
            extensions: ["gif", "png", "jpg", "jpeg", "js", "css"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Format a timestamp as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
///
/// `None` when the time is outside the range chrono can represent.
pub fn http_date(time: SystemTime) -> Option<String> {
    let datetime = match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(since) => DateTime::<Utc>::from_timestamp(
            i64::try_from(since.as_secs()).ok()?,
            since.subsec_nanos(),
        )?,
        Err(before) => {
            let before = before.duration();
            let secs = i64::try_from(before.as_secs()).ok()?;
            match before.subsec_nanos() {
                0 => DateTime::<Utc>::from_timestamp(-secs, 0)?,
                nanos => DateTime::<Utc>::from_timestamp(-secs - 1, 1_000_000_000 - nanos)?,
            }
        }
    };
    Some(datetime.format(HTTP_DATE_FORMAT).to_string())
}

/// Generate `ETag` from a `Last-Modified` value
///
/// Base64 (standard alphabet, padded) of the SHA-1 digest, unquoted.
pub fn generate_etag(last_modified: &str) -> String {
    let digest = Sha1::digest(last_modified.as_bytes());
    STANDARD.encode(digest)
}
