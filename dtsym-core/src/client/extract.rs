//! Named-entry extraction from the client archive.
//!
//! The served archive is a zip expected to contain exactly one relevant
//! entry, named like the client binary. Extraction scans the entries for
//! that name and streams the match into a caller-supplied sink. A broken
//! archive and a valid archive without the entry are reported differently
//! so the caller can keep the two failure shapes apart.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{DtsymError, DtsymResult};

/// Copies the decompressed content of the entry named `expected_name` into
/// `dest`.
///
/// Returns `true` if the entry was found and copied, `false` if the archive
/// is valid but holds no entry with that name.
///
/// # Errors
///
/// Returns [`DtsymError::ArchiveCorrupt`] if the file is not a readable zip
/// archive or an entry fails to decompress.
pub fn extract_named_entry<W: Write>(
    archive_path: &Path,
    expected_name: &str,
    dest: &mut W,
) -> DtsymResult<bool> {
    let file = File::open(archive_path).map_err(|e| {
        DtsymError::io(format!("open archive {}", archive_path.display()), e)
    })?;

    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| DtsymError::ArchiveCorrupt {
            reason: e.to_string(),
        })?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| DtsymError::ArchiveCorrupt {
                reason: e.to_string(),
            })?;

        if entry.name() != expected_name {
            debug!("Skipping archive entry {}", entry.name());
            continue;
        }

        io::copy(&mut entry, dest).map_err(|e| DtsymError::ArchiveCorrupt {
            reason: format!("failed to decompress {}: {}", expected_name, e),
        })?;
        return Ok(true);
    }

    Ok(false)
}

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> DtsymResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            DtsymError::io(format!("read metadata for {}", path.display()), e)
        })?;

        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o755);

        fs::set_permissions(path, permissions).map_err(|e| {
            DtsymError::io(
                format!("set executable permission on {}", path.display()),
                e,
            )
        })?;
    }

    Ok(())
}
