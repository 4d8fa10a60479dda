//! Configuration for the symbolication client cache.
//!
//! Everything the cache needs (endpoint, credential, directory, binary name)
//! is injected through [`DssClientConfig`] instead of read from ambient
//! state, so independent instances can coexist in tests and pipelines.

use std::path::PathBuf;
use url::Url;

/// Directory the client binary and its version marker live in, relative to
/// the working directory of the pipeline step.
pub const CACHE_DIR: &str = "dynatrace";

/// Marker file recording the URL of the last installed client archive.
pub const VERSION_MARKER: &str = "version";

/// Name of the client binary, both inside the served archive and on disk.
pub const CLIENT_BINARY: &str = "DTXDssClient";

// ============================================================================
// Config
// ============================================================================

/// Settings for one client cache instance.
#[derive(Debug, Clone)]
pub struct DssClientConfig {
    /// Environment API endpoint, normalized without a trailing slash.
    pub server: String,
    /// API token used for the metadata request.
    pub api_token: String,
    /// Directory holding the marker and binary pair.
    pub cache_dir: PathBuf,
    /// Expected binary name inside the served archive.
    pub binary_name: String,
    /// Deprecated escape hatch: a pre-installed client to use as-is.
    pub pinned_client_path: Option<PathBuf>,
}

impl DssClientConfig {
    /// Creates a config with the default cache location and binary name.
    pub fn new(server: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            server: without_trailing_slash(&server.into()).to_string(),
            api_token: api_token.into(),
            cache_dir: PathBuf::from(CACHE_DIR),
            binary_name: CLIENT_BINARY.to_string(),
            pinned_client_path: None,
        }
    }

    /// Overrides the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Supplies a pre-installed client path, skipping all remote steps.
    pub fn with_pinned_client(mut self, path: impl Into<PathBuf>) -> Self {
        self.pinned_client_path = Some(path.into());
        self
    }

    /// URL of the metadata endpoint resolving the current client archive.
    pub fn metadata_url(&self) -> String {
        format!(
            "{}/api/config/v1/symfiles/dtxdss-download?Api-Token={}",
            self.server, self.api_token
        )
    }

    /// Host name of the configured environment, for operator-facing
    /// messages. Tolerates scheme-less input like `example.com/`.
    pub fn host_name(&self) -> String {
        host_of(&self.server)
    }

    /// Path of the installed client binary.
    pub fn binary_path(&self) -> PathBuf {
        self.cache_dir.join(&self.binary_name)
    }

    /// Path of the version marker file.
    pub fn marker_path(&self) -> PathBuf {
        self.cache_dir.join(VERSION_MARKER)
    }
}

// ============================================================================
// URL helpers
// ============================================================================

/// Strips trailing slashes from a server URL so paths can be appended.
pub fn without_trailing_slash(server: &str) -> &str {
    server.trim_end_matches('/')
}

fn host_of(server: &str) -> String {
    let parsed =
        Url::parse(server).or_else(|_| Url::parse(&format!("https://{}", server)));
    match parsed {
        Ok(url) => url.host_str().unwrap_or_default().to_string(),
        Err(_) => String::new(),
    }
}
