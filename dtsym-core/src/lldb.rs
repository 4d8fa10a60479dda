//! LLDB framework link management.
//!
//! The symbolication client loads `LLDB.framework` from the directory it
//! runs in. Rather than bundling the framework, a symlink with that fixed
//! name is kept beside the client, pointing at the framework of the active
//! toolchain (or at a caller-supplied copy). Re-linking always deletes the
//! previous link first, so repeated runs against changing toolchains leave
//! exactly one link and never accumulate stale ones.
//!
//! Only symlinks are considered managed: a real file or directory occupying
//! the link name is reported as a configuration error instead of being
//! deleted or silently kept.

use std::fs;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{DtsymError, DtsymResult};

/// Fixed name of the managed link inside the destination directory.
pub const LLDB_LINK_NAME: &str = "LLDB.framework";

/// Suffix of a full Xcode installation's developer directory.
const XCODE_DEVELOPER_SUFFIX: &str = "/Developer";

/// Suffix of a Command Line Tools-only installation.
const XCODE_CLT_SUFFIX: &str = "/CommandLineTools";

// ============================================================================
// Linking
// ============================================================================

/// Links a caller-supplied LLDB framework into `destination_dir`.
///
/// # Errors
///
/// Returns an error if either path is empty or does not exist, if a
/// non-symlink entry occupies the link name, or if the link cannot be
/// created.
pub fn link_custom_lldb(lldb_path: &Path, destination_dir: &Path) -> DtsymResult<()> {
    require_path(destination_dir)?;
    require_path(lldb_path)?;
    info!(
        "Linking custom LLDB framework into {}",
        destination_dir.display()
    );
    replace_link(lldb_path, destination_dir)
}

/// Discovers the active toolchain's LLDB framework and links it into
/// `destination_dir`.
///
/// When the toolchain root reported by `xcode-select` matches neither a
/// full Xcode installation nor a Command Line Tools layout, no candidate
/// exists and the call does nothing.
///
/// # Errors
///
/// Returns an error if `destination_dir` is invalid, the derived framework
/// path does not exist, a non-symlink entry occupies the link name, or the
/// link cannot be created.
pub async fn auto_link_lldb(destination_dir: &Path) -> DtsymResult<()> {
    require_path(destination_dir)?;

    let Some(toolchain_root) = query_active_toolchain().await else {
        warn!("No active toolchain root could be determined; leaving LLDB unlinked");
        return Ok(());
    };

    let Some(lldb_path) = active_lldb_path(&toolchain_root) else {
        warn!(
            "Toolchain root {} matches no known layout; leaving LLDB unlinked",
            toolchain_root
        );
        return Ok(());
    };

    info!("LLDB framework found at: {}", lldb_path.display());
    require_path(&lldb_path)?;
    replace_link(&lldb_path, destination_dir)
}

/// Derives the LLDB framework location from a toolchain root path.
///
/// A root ending in `/Developer` belongs to a full Xcode installation,
/// whose frameworks live one level up; a root ending in
/// `/CommandLineTools` keeps them under its own `Library`. Anything else
/// yields no candidate.
pub fn active_lldb_path(toolchain_root: &str) -> Option<PathBuf> {
    let root = Path::new(toolchain_root);
    if toolchain_root.ends_with(XCODE_DEVELOPER_SUFFIX) {
        root.parent()
            .map(|parent| parent.join("SharedFrameworks").join(LLDB_LINK_NAME))
    } else if toolchain_root.ends_with(XCODE_CLT_SUFFIX) {
        Some(root.join("Library").join("PrivateFrameworks").join(LLDB_LINK_NAME))
    } else {
        None
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Asks `xcode-select` for the active developer directory.
///
/// Probe failures yield `None` rather than an error; a machine without the
/// toolchain simply has no candidate to link.
async fn query_active_toolchain() -> Option<String> {
    let output = Command::new("xcrun")
        .args(["xcode-select", "--print-path"])
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        debug!("xcode-select exited with {}", output.status);
        return None;
    }

    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

fn require_path(path: &Path) -> DtsymResult<()> {
    if path.as_os_str().is_empty() {
        return Err(DtsymError::PathEmpty);
    }
    if !path.exists() {
        return Err(DtsymError::PathMissing {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn replace_link(source: &Path, destination_dir: &Path) -> DtsymResult<()> {
    let link = destination_dir.join(LLDB_LINK_NAME);

    match fs::symlink_metadata(&link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            debug!("Removing existing link at {}", link.display());
            fs::remove_file(&link)
                .map_err(|e| DtsymError::io("remove existing LLDB link", e))?;
        }
        Ok(_) => return Err(DtsymError::LinkObstructed { path: link }),
        Err(_) => {}
    }

    create_symlink(source, &link)
}

#[cfg(unix)]
fn create_symlink(source: &Path, link: &Path) -> DtsymResult<()> {
    info!(
        "Creating a symlink of {} at {}",
        source.display(),
        link.display()
    );
    std::os::unix::fs::symlink(source, link)
        .map_err(|e| DtsymError::io("create LLDB link", e))
}

#[cfg(not(unix))]
fn create_symlink(_source: &Path, link: &Path) -> DtsymResult<()> {
    Err(DtsymError::io(
        format!("create LLDB link at {}", link.display()),
        std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "symlinks are only supported on Unix platforms",
        ),
    ))
}
