//! Streaming download of the client archive.
//!
//! The archive is staged into a temporary file so a failed or truncated
//! download never touches the cache directory. Zero-byte payloads are
//! rejected here; some environments answer a success status with an empty
//! body when the archive is temporarily unavailable.

use std::io::Write;

use futures::StreamExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{DtsymError, DtsymResult};

/// Downloads `url` into a fresh temporary file.
///
/// The file is deleted when the returned handle is dropped.
///
/// # Errors
///
/// Returns an error if the request fails, the response status is not a
/// success, a chunk cannot be read or written, or the payload is empty.
pub async fn download_to_temp(url: &str) -> DtsymResult<NamedTempFile> {
    debug!("Downloading client archive from {}", url);

    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|source| DtsymError::DownloadRequest {
            url: url.to_string(),
            source,
        })?;

    let mut file = NamedTempFile::new()
        .map_err(|e| DtsymError::io("create temporary file for download", e))?;

    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| DtsymError::DownloadRequest {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk)
            .map_err(|e| DtsymError::io("write downloaded chunk", e))?;
        bytes_downloaded += chunk.len() as u64;
    }

    file.flush()
        .map_err(|e| DtsymError::io("flush downloaded archive", e))?;

    if bytes_downloaded == 0 {
        return Err(DtsymError::DownloadEmpty {
            url: url.to_string(),
        });
    }

    debug!("Downloaded {} bytes", bytes_downloaded);
    Ok(file)
}
