//! HTTP protocol layer module
//!
//! Content types, cache validation and response builders, decoupled from
//! filesystem access and request routing.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use cache::{CacheDecision, CachePolicy, ConditionalHeaders, FileMetadata};
pub use response::{
    build_304_response, build_404_response, build_500_response, build_file_response,
    build_html_response, build_redirect_response,
};
