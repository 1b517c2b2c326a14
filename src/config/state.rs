// Application state module
// Read-only state shared by every request for the lifetime of the process

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use super::types::Config;
use crate::http::cache::{CachePolicy, MAX_AGE_LIMIT};

/// Application state
pub struct AppState {
    pub config: Config,
    /// Canonical form of `server.root`, the boundary no request may leave
    pub root: PathBuf,
    pub cache_policy: CachePolicy,
    pub fs_timeout: Duration,
}

impl AppState {
    /// Build state from configuration, resolving the root directory once
    ///
    /// Fails when the root does not exist or cannot be canonicalized, or
    /// when `cache.max_age` is larger than `MAX_AGE_LIMIT`.
    pub fn new(config: Config) -> io::Result<Self> {
        if config.cache.max_age > MAX_AGE_LIMIT {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "cache.max_age {} exceeds the limit of {MAX_AGE_LIMIT} seconds",
                    config.cache.max_age
                ),
            ));
        }

        let root = std::fs::canonicalize(&config.server.root)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("root '{}' is not a directory", root.display()),
            ));
        }

        let cache_policy = CachePolicy::new(config.cache.max_age, &config.cache.extensions);
        let fs_timeout = Duration::from_secs(config.performance.fs_timeout);

        Ok(Self {
            config,
            root,
            cache_policy,
            fs_timeout,
        })
    }
}
