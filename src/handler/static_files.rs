//! Static file serving module
//!
//! File and directory responders: file reads with cache validation, index
//! page lookup and generated directory listings.

use crate::config::AppState;
use crate::handler::path;
use crate::handler::router::RequestContext;
use crate::http::{self, mime, CacheDecision, FileMetadata};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Run a filesystem operation with an upper bound on how long it may take
///
/// Expiry is reported as `io::ErrorKind::TimedOut`.
pub async fn timed<T>(limit: Duration, op: impl Future<Output = io::Result<T>>) -> io::Result<T> {
    tokio::time::timeout(limit, op).await.unwrap_or_else(|_| {
        Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("filesystem operation exceeded {limit:?}"),
        ))
    })
}

/// Canonicalize `target` and check it stays under the served root
pub async fn confined(target: &Path, state: &AppState) -> bool {
    match timed(state.fs_timeout, fs::canonicalize(target)).await {
        Ok(canonical) => path::is_within_root(&canonical, &state.root),
        Err(_) => false,
    }
}

/// Serve a regular file with Last-Modified / `ETag` / Expires handling
pub async fn respond_file(
    file_path: &Path,
    ctx: &RequestContext,
    state: &AppState,
) -> Response<Full<Bytes>> {
    // Metadata is re-read on every request; nothing is cached in process
    let meta = match timed(state.fs_timeout, fs::metadata(file_path)).await {
        Ok(m) => FileMetadata::from(&m),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to stat file '{}': {e}",
                file_path.display()
            ));
            return http::build_500_response(&e);
        }
    };

    let content = match timed(state.fs_timeout, read_up_to(file_path, meta.size)).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            return http::build_500_response(&e);
        }
    };

    let content_type = mime::lookup(file_path);
    let extension = file_path.extension().and_then(|e| e.to_str());

    match state.cache_policy.evaluate(&meta, &ctx.headers, extension) {
        CacheDecision::NotModified => http::build_304_response(content_type),
        CacheDecision::Fresh(headers) => {
            logger::log_file_served(&ctx.raw_url, content.len());
            http::build_file_response(Bytes::from(content), content_type, &headers)
        }
        CacheDecision::Error(message) => {
            logger::log_error(&format!(
                "Cannot validate cache for '{}': {message}",
                file_path.display()
            ));
            http::build_500_response(&message)
        }
    }
}

/// Read at most `limit` bytes, so a file growing mid-read cannot grow the body
async fn read_up_to(file_path: &Path, limit: u64) -> io::Result<Vec<u8>> {
    let file = fs::File::open(file_path).await?;
    let mut content = Vec::new();
    file.take(limit).read_to_end(&mut content).await?;
    Ok(content)
}

/// Serve a directory: its index page if present, otherwise a listing
pub async fn respond_directory(
    dir: &Path,
    ctx: &RequestContext,
    state: &AppState,
) -> Response<Full<Bytes>> {
    if let Some(index_path) = find_index_page(dir, state).await {
        return respond_file(&index_path, ctx, state).await;
    }

    match timed(state.fs_timeout, list_entries(dir)).await {
        Ok(entries) => http::build_html_response(render_listing(&ctx.url_path, &entries)),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read directory '{}': {e}",
                dir.display()
            ));
            http::build_500_response(&e)
        }
    }
}

/// Locate the configured index page inside `dir`
async fn find_index_page(dir: &Path, state: &AppState) -> Option<PathBuf> {
    let index_path = dir.join(&state.config.server.index_page);
    let meta = timed(state.fs_timeout, fs::metadata(&index_path)).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    if !confined(&index_path, state).await {
        logger::log_warning(&format!(
            "Index page outside root ignored: {}",
            index_path.display()
        ));
        return None;
    }
    Some(index_path)
}

/// A directory entry as shown in a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read directory entries in the order the filesystem returns them
pub async fn list_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        // Follow symlinks so linked directories still get a trailing slash
        let is_dir = fs::metadata(entry.path())
            .await
            .is_ok_and(|m| m.is_dir());
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }

    Ok(entries)
}

/// Render the HTML listing for `url_path`
pub fn render_listing(url_path: &str, entries: &[ListingEntry]) -> String {
    let mut html = format!(
        "<h1>Index of {}</h1>",
        http::response::escape_html(&path::decode_url_path(url_path))
    );

    for entry in entries {
        let link = path::join_link(url_path, &entry.name, entry.is_dir);
        html.push_str(&format!(
            "<p><a href='{}'>{}</a></p>",
            http::response::escape_html(&link),
            http::response::escape_html(&entry.name)
        ));
    }

    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_listing() {
        let entries = vec![
            ListingEntry {
                name: "a.txt".to_string(),
                is_dir: false,
            },
            ListingEntry {
                name: "sub".to_string(),
                is_dir: true,
            },
        ];
        let html = render_listing("/docs/", &entries);
        assert_eq!(
            html,
            "<h1>Index of /docs/</h1>\
             <p><a href='/docs/a.txt'>a.txt</a></p>\
             <p><a href='/docs/sub/'>sub</a></p>"
        );
    }

    #[test]
    fn test_render_listing_escapes_names() {
        let entries = vec![ListingEntry {
            name: "<b>&.html".to_string(),
            is_dir: false,
        }];
        let html = render_listing("/my%20dir/", &entries);
        assert!(html.starts_with("<h1>Index of /my dir/</h1>"));
        assert!(html.contains("<a href='/my%20dir/%3Cb%3E&amp;.html'>&lt;b&gt;&amp;.html</a>"));
    }

    #[test]
    fn test_render_empty_listing() {
        assert_eq!(render_listing("/", &[]), "<h1>Index of /</h1>");
    }

    #[tokio::test]
    async fn test_timed_reports_timeout() {
        let err = timed(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), io::Error>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_read_up_to_stops_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("grown.txt");
        std::fs::write(&file, "0123456789").unwrap();

        assert_eq!(read_up_to(&file, 4).await.unwrap(), b"0123");
        assert_eq!(read_up_to(&file, 100).await.unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_list_entries_marks_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let mut entries = list_entries(dir.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            entries,
            vec![
                ListingEntry {
                    name: "file.txt".to_string(),
                    is_dir: false
                },
                ListingEntry {
                    name: "nested".to_string(),
                    is_dir: true
                },
            ]
        );
    }
}
