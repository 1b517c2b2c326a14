//! Static file server
//!
//! Serves a directory tree over HTTP/1.1 with directory listings, index pages
//! and Last-Modified / `ETag` / Expires caching.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
