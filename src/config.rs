// src/config.rs
// =============================================================================
// Settings for an archive run.
//
// The shell fills these in (the binary maps its command-line flags onto them);
// anything left alone keeps the default below.
// =============================================================================

use serde::{Deserialize, Serialize};

/// Folder name used when the caller gives no display name.
pub const DEFAULT_NAME: &str = "Downloaded Website";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Per-request timeout, in seconds
    pub timeout_secs: u64,
    /// Redirects followed before a request is given up on
    pub max_redirects: usize,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Folder name when the caller doesn't supply one
    pub default_name: String,
    /// Whether to save the site icon as favicon.ico
    pub fetch_favicon: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig {
            timeout_secs: 30,
            max_redirects: 10,
            user_agent: format!("page-archiver/{}", env!("CARGO_PKG_VERSION")),
            default_name: DEFAULT_NAME.to_string(),
            fetch_favicon: true,
        }
    }
}
