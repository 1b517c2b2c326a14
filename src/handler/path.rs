//! Request path resolution
//!
//! Maps URL paths onto the served root without ever leaving it, and builds
//! the link targets used by directory listings.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Component, Path, PathBuf};

/// Characters escaped in a listing link's final segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'\'')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-decode a URL path for display
pub fn decode_url_path(url_path: &str) -> String {
    percent_decode_str(url_path).decode_utf8_lossy().into_owned()
}

/// Normalize a URL path into a path relative to the root
///
/// Empty and `.` segments are dropped and `..` pops the previous segment,
/// stopping at the root rather than escaping it. Returns `None` for segments
/// that cannot name a plain directory entry (NUL bytes, drive prefixes).
pub fn normalize_url_path(url_path: &str) -> Option<PathBuf> {
    let decoded = decode_url_path(url_path);
    let mut segments: Vec<&str> = Vec::new();

    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => {
                if name.contains('\0') || !is_plain_name(name) {
                    return None;
                }
                segments.push(name);
            }
        }
    }

    Some(segments.iter().collect())
}

/// Join the root with a URL path, confined to the root
pub fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    normalize_url_path(url_path).map(|relative| root.join(relative))
}

/// Whether an existing path, after following symlinks, is inside `root`
///
/// `root` must already be canonical.
pub fn is_within_root(canonical: &Path, root: &Path) -> bool {
    canonical.starts_with(root)
}

/// Build the href for a directory entry listed under `url_path`
///
/// Exactly one `/` separates the parts; directories get a trailing `/`.
pub fn join_link(url_path: &str, name: &str, is_dir: bool) -> String {
    let base = url_path.trim_end_matches('/');
    let encoded = utf8_percent_encode(name, SEGMENT);
    if is_dir {
        format!("{base}/{encoded}/")
    } else {
        format!("{base}/{encoded}")
    }
}

fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
