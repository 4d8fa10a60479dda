//! Symbolication client management.
//!
//! The Dynatrace symbolication client (`DTXDssClient`) is an externally
//! maintained binary that this crate keeps cached next to the build, pinned
//! to whatever version the configured environment currently serves.
//!
//! # Architecture
//!
//! - `config`: Injected endpoint/token/cache settings and URL helpers
//! - `descriptor`: Metadata request resolving the current client URL
//! - `download`: Streaming archive download with empty-payload detection
//! - `extract`: Named-entry zip extraction and executable bits
//! - `cache`: The marker+binary cache with its fallback policy
//!
//! # Example
//!
//! ```ignore
//! use dtsym_core::client::{DssClientCache, DssClientConfig};
//!
//! let config = DssClientConfig::new("https://example.live.dynatrace.com", token);
//! let client = DssClientCache::new(config);
//!
//! // Returns a runnable path, downloading or updating only when needed.
//! let path = client.resolve().await?;
//! ```

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod download;
pub mod extract;

// Re-export commonly used items
pub use cache::DssClientCache;
pub use config::{without_trailing_slash, DssClientConfig, CLIENT_BINARY, VERSION_MARKER};
pub use descriptor::{redact_api_token, ClientDescriptor};
pub use extract::make_executable;
