//! Symbol file upload for platforms served over the configuration API.
//!
//! Android mapping files go straight to the environment as a single HTTP
//! PUT; there is no caching or retry at this boundary, just a status-code
//! check. Files above the API's plain-text size limit are compressed into
//! a sibling zip first.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::client::config::without_trailing_slash;
use crate::error::{DtsymError, DtsymResult};

/// Symbol files above this size are zipped before upload.
pub const AUTO_ZIP_THRESHOLD: u64 = 10 * 1024 * 1024;

// ============================================================================
// Upload parameters
// ============================================================================

/// Identifies where a symbol file belongs within an environment.
#[derive(Debug, Clone)]
pub struct SymbolUpload {
    /// Environment API endpoint.
    pub server: String,
    /// API token authorizing the upload.
    pub api_token: String,
    /// Application ID from the environment UI.
    pub app_id: String,
    /// Bundle identifier / package name of the app.
    pub bundle_id: String,
    /// Target OS of the symbol file (uppercased into the URL).
    pub os: String,
    /// Version code of the build.
    pub version: String,
    /// User-facing version string of the build.
    pub version_str: String,
}

impl SymbolUpload {
    fn url(&self) -> String {
        format!(
            "{}/api/config/v1/symfiles/{}/{}/{}/{}/{}",
            without_trailing_slash(&self.server),
            self.app_id,
            self.bundle_id,
            self.os.to_uppercase(),
            self.version,
            self.version_str
        )
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Compresses an oversized symbol file into `<path>.zip` and returns the
/// path to upload.
///
/// The input path is returned unchanged when auto-zip is disabled, the
/// file is already a zip, or its size does not exceed the threshold.
///
/// # Errors
///
/// Returns an error if the file cannot be inspected or the zip cannot be
/// written.
pub fn zip_if_required(symbols_file: &Path, auto_zip: bool) -> DtsymResult<PathBuf> {
    if !auto_zip || has_zip_extension(symbols_file) {
        return Ok(symbols_file.to_path_buf());
    }

    let size = std::fs::metadata(symbols_file)
        .map_err(|e| {
            DtsymError::io(format!("inspect symbol file {}", symbols_file.display()), e)
        })?
        .len();
    if size <= AUTO_ZIP_THRESHOLD {
        debug!("Symbol file is {} bytes, uploading as-is", size);
        return Ok(symbols_file.to_path_buf());
    }

    let mut zipped = symbols_file.as_os_str().to_os_string();
    zipped.push(".zip");
    let zipped = PathBuf::from(zipped);

    info!(
        "Symbol file exceeds {} bytes, compressing to {}",
        AUTO_ZIP_THRESHOLD,
        zipped.display()
    );

    let entry_name = symbols_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "symbols".to_string());

    let output = File::create(&zipped)
        .map_err(|e| DtsymError::io(format!("create {}", zipped.display()), e))?;
    let mut writer = zip::ZipWriter::new(output);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    writer
        .start_file(entry_name, options)
        .map_err(|e| DtsymError::io("write zip entry header", io::Error::other(e)))?;

    let mut input = File::open(symbols_file)
        .map_err(|e| DtsymError::io(format!("open {}", symbols_file.display()), e))?;
    io::copy(&mut input, &mut writer)
        .map_err(|e| DtsymError::io("compress symbol file", e))?;
    writer
        .finish()
        .map_err(|e| DtsymError::io("finish symbol zip", io::Error::other(e)))?;

    Ok(zipped)
}

/// Uploads a symbol file with a single PUT request.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the request fails, or the
/// environment answers with a non-success status.
pub async fn put_symbols(upload: &SymbolUpload, symbols_file: &Path) -> DtsymResult<()> {
    let url = upload.url();
    let content_type = if has_zip_extension(symbols_file) {
        "application/zip"
    } else {
        "text/plain"
    };

    let body = tokio::fs::read(symbols_file).await.map_err(|e| {
        DtsymError::io(format!("read symbol file {}", symbols_file.display()), e)
    })?;

    info!(
        "Uploading {} ({} bytes) to {}",
        symbols_file.display(),
        body.len(),
        url
    );

    let response = reqwest::Client::new()
        .put(&url)
        .header("Authorization", format!("Api-Token {}", upload.api_token))
        .header("Content-Type", content_type)
        .body(body)
        .send()
        .await
        .map_err(DtsymError::UploadRequest)?;

    let status = response.status();
    if status.is_success() {
        info!("Symbol upload accepted with status {}", status.as_u16());
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(DtsymError::UploadRejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn has_zip_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}
