//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

use std::path::Path;

/// Content-Type for anything the table does not know
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Get MIME Content-Type for a file path
///
/// The extension is the text after the final dot, compared lower-cased.
///
/// # Examples
/// ```
/// use static_server::http::mime::lookup;
/// assert_eq!(lookup("site/style.CSS"), "text/css");
/// assert_eq!(lookup("notes.txt"), "application/octet-stream");
/// ```
pub fn lookup(path: impl AsRef<Path>) -> &'static str {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    get_content_type(extension.as_deref())
}

/// Get MIME Content-Type based on a lower-case file extension
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("css") => "text/css",
        Some("gif") => "image/gif",
        Some("html") => "text/html",
        Some("ico") => "image/x-icon",
        Some("jpeg") => "image/jpeg",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
