//! dtsym Core Library
//!
//! This crate provides the core functionality for dtsym, a pipeline tool
//! that processes and uploads mobile debug symbols to a Dynatrace
//! environment. It includes:
//!
//! - A self-updating cache for the symbolication client binary, pinned to
//!   the version the configured environment currently serves, with a
//!   fall-back to the previously cached copy when the environment is
//!   unreachable
//! - Idempotent LLDB framework linking beside the client binary
//! - The symbol upload call for platforms served over the configuration API
//! - Argv assembly and execution for the client binary

pub mod client;
pub mod error;
pub mod invoke;
pub mod lldb;
pub mod upload;

// Re-exports for convenience
pub use client::{DssClientCache, DssClientConfig};
pub use error::{DtsymError, DtsymResult};
pub use invoke::{run_client, ClientAction, ClientInvocation};
pub use lldb::{auto_link_lldb, link_custom_lldb, LLDB_LINK_NAME};
pub use upload::{put_symbols, zip_if_required, SymbolUpload};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
