//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: builds the request context,
//! stats the resolved path and hands the request to exactly one responder.

use crate::config::AppState;
use crate::handler::{path, static_files};
use crate::http::{self, ConditionalHeaders};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{HeaderMap, Request, Response, Uri};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;

/// Request context encapsulating information needed for request processing
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request target as received (path and query)
    pub raw_url: String,
    /// URL path, still percent-encoded
    pub url_path: String,
    pub query: Option<String>,
    pub headers: ConditionalHeaders,
    /// Root joined with the normalized path; `None` if it cannot be confined
    pub decoded_path: Option<PathBuf>,
}

impl RequestContext {
    pub fn new(uri: &Uri, headers: &HeaderMap, root: &Path) -> Self {
        let url_path = uri.path().to_string();
        let raw_url = uri
            .path_and_query()
            .map_or_else(|| url_path.clone(), ToString::to_string);

        Self {
            decoded_path: path::resolve(root, &url_path),
            raw_url,
            query: uri.query().map(ToString::to_string),
            headers: ConditionalHeaders::from_header_map(headers),
            url_path,
        }
    }

    pub fn has_trailing_slash(&self) -> bool {
        self.url_path.ends_with('/')
    }

    /// Location for the trailing-slash redirect, keeping any query string
    pub fn redirect_location(&self) -> String {
        match &self.query {
            Some(q) => format!("{}/?{q}", self.url_path),
            None => format!("{}/", self.url_path),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let access_log = state.config.logging.access_log;

    let ctx = RequestContext::new(req.uri(), req.headers(), &state.root);
    if access_log {
        logger::log_request(&ctx.raw_url);
    }

    let response = route(&ctx, &state).await;

    if access_log {
        let mut entry = AccessLogEntry::new(
            remote_addr.ip().to_string(),
            req.method().to_string(),
            ctx.raw_url.clone(),
        );
        entry.http_version = format!("{:?}", req.version())
            .trim_start_matches("HTTP/")
            .to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.referer = header_string(req.headers(), "referer");
        entry.user_agent = header_string(req.headers(), "user-agent");
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Stat the resolved path and dispatch to the matching responder
pub async fn route(ctx: &RequestContext, state: &AppState) -> Response<Full<Bytes>> {
    let Some(target) = ctx.decoded_path.as_deref() else {
        return http::build_404_response(&ctx.raw_url);
    };

    // Missing file, permission problem or timeout: all terminal 404s
    let Ok(meta) = static_files::timed(state.fs_timeout, fs::metadata(target)).await else {
        return http::build_404_response(&ctx.raw_url);
    };

    if !static_files::confined(target, state).await {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            ctx.raw_url,
            target.display()
        ));
        return http::build_404_response(&ctx.raw_url);
    }

    if meta.is_dir() {
        if ctx.has_trailing_slash() {
            static_files::respond_directory(target, ctx, state).await
        } else {
            http::build_redirect_response(&ctx.redirect_location())
        }
    } else if !meta.is_file() || ctx.has_trailing_slash() {
        // FIFOs, sockets and devices are never opened; `file/` is not a file
        http::build_404_response(&ctx.raw_url)
    } else {
        static_files::respond_file(target, ctx, state).await
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}
