//! Request handler module
//!
//! Responsible for request routing dispatch and the file / directory
//! responders behind it.

pub mod path;
pub mod router;
pub mod static_files;

// Re-export main entry points
pub use router::{handle_request, route, RequestContext};
