//! Error types for dtsym.
//!
//! All modules use `DtsymResult<T>` as their return type. Errors that the
//! client cache may absorb by falling back to a previously installed binary
//! answer `true` from [`DtsymError::recoverable`]; everything else aborts the
//! pipeline step.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dtsym operations.
pub type DtsymResult<T> = Result<T, DtsymError>;

/// All errors that can occur in dtsym.
#[derive(Error, Debug)]
pub enum DtsymError {
    // Metadata endpoint errors
    #[error("can't connect to server, request to {url} failed: {source}")]
    MetadataRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("can't connect to server, invalid response {reason} ({status}) for URL: {url}")]
    MetadataStatus {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("client descriptor is not valid JSON: {0}")]
    DescriptorParse(#[from] serde_json::Error),

    #[error("client descriptor carries no download URL (dssClientUrl missing or empty)")]
    DescriptorUrlMissing,

    // Artifact download / archive errors
    #[error("client download from {url} failed: {source}")]
    DownloadRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("client archive downloaded from {url} is empty")]
    DownloadEmpty { url: String },

    #[error("client archive is corrupt: {reason}")]
    ArchiveCorrupt { reason: String },

    #[error("client archive contains no entry named {expected}")]
    ArchiveEntryMissing { expected: String },

    // Cache errors
    #[error("failed to create cache directory {path}: {source}")]
    CacheDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache directory {path} is locked by another update")]
    CacheBusy { path: PathBuf },

    #[error("{cause}; no previously cached client is available as a fallback. Check your server URL and API token, or contact Dynatrace support: https://www.dynatrace.com/support/")]
    NoCachedClient { cause: String },

    // Path validation errors
    #[error("path must not be empty")]
    PathEmpty,

    #[error("path does not exist: {path}")]
    PathMissing { path: PathBuf },

    #[error("{path} already exists and is not a symlink; remove it or point the link elsewhere")]
    LinkObstructed { path: PathBuf },

    // Symbol upload errors
    #[error("symbol upload request failed: {0}")]
    UploadRequest(#[source] reqwest::Error),

    #[error("symbol upload rejected with status {status}: {body}")]
    UploadRejected { status: u16, body: String },

    // Client invocation errors
    #[error("failed to launch {command}: {source}")]
    ClientSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with code {code}: {stderr}")]
    ClientFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    // IO errors
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DtsymError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the client cache may absorb this error by returning a
    /// previously installed binary instead of propagating it.
    pub fn recoverable(&self) -> bool {
        matches!(
            self,
            Self::MetadataRequest { .. }
                | Self::MetadataStatus { .. }
                | Self::DescriptorParse(_)
                | Self::DescriptorUrlMissing
                | Self::DownloadRequest { .. }
                | Self::DownloadEmpty { .. }
                | Self::ArchiveCorrupt { .. }
                | Self::ArchiveEntryMissing { .. }
                | Self::CacheBusy { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failures_are_recoverable() {
        assert!(DtsymError::DescriptorUrlMissing.recoverable());
        assert!(DtsymError::MetadataStatus {
            url: "https://example.com".into(),
            status: 401,
            reason: "Unauthorized".into(),
        }
        .recoverable());
        assert!(DtsymError::DownloadEmpty {
            url: "https://example.com/a.zip".into()
        }
        .recoverable());
        assert!(DtsymError::ArchiveCorrupt {
            reason: "bad header".into()
        }
        .recoverable());
        assert!(DtsymError::ArchiveEntryMissing {
            expected: "DTXDssClient".into()
        }
        .recoverable());
    }

    #[test]
    fn local_failures_are_fatal() {
        assert!(!DtsymError::PathEmpty.recoverable());
        assert!(!DtsymError::PathMissing {
            path: PathBuf::from("missing")
        }
        .recoverable());
        assert!(!DtsymError::CacheDirCreate {
            path: PathBuf::from("dynatrace"),
            source: std::io::Error::other("denied"),
        }
        .recoverable());
        assert!(!DtsymError::NoCachedClient {
            cause: "404".into()
        }
        .recoverable());
    }

    #[test]
    fn terminal_error_points_at_support() {
        let err = DtsymError::NoCachedClient {
            cause: "descriptor fetch failed".into(),
        };
        let message = err.to_string();
        assert!(message.contains("descriptor fetch failed"));
        assert!(message.contains("dynatrace.com/support"));
    }
}
