//! The on-disk client cache and its update policy.
//!
//! The cache is a two-file pair inside the configured directory: the
//! `version` marker (plain text, holding the URL of the last installed
//! archive) and the client binary itself. `resolve` keeps that pair in sync
//! with whatever the environment currently serves and always hands back a
//! runnable path, preferring a stale cached binary over failing on a
//! transient remote problem. Only when no usable cached binary exists does
//! a remote failure become fatal.
//!
//! Installs commit through an atomic rename: the entry is staged into a
//! temporary file inside the cache directory, the rename over the binary
//! path is the commit point, and the marker is written last. A crash
//! before the rename leaves the previous install untouched; a crash after
//! it leaves a marker mismatch that the next run repairs by reinstalling.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::config::DssClientConfig;
use super::descriptor::fetch_client_descriptor;
use super::download::download_to_temp;
use super::extract::{extract_named_entry, make_executable};
use crate::error::{DtsymError, DtsymResult};

// ============================================================================
// Client cache
// ============================================================================

/// Keeps the symbolication client installed and current in its cache
/// directory.
pub struct DssClientCache {
    config: DssClientConfig,
}

impl DssClientCache {
    /// Creates a cache operating on the directory named in `config`.
    pub fn new(config: DssClientConfig) -> Self {
        Self { config }
    }

    /// Path the installed client binary lives at.
    pub fn binary_path(&self) -> PathBuf {
        self.config.binary_path()
    }

    /// Path of the version marker file.
    pub fn marker_path(&self) -> PathBuf {
        self.config.marker_path()
    }

    /// Returns a runnable client path, downloading or updating the cached
    /// binary only when the remote descriptor differs from the marker.
    ///
    /// Remote failures (metadata, descriptor, download, archive) are
    /// absorbed by returning the previously cached binary when one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created, an
    /// install step fails on local IO, or a remote failure occurs with no
    /// usable cached binary to fall back to.
    pub async fn resolve(&self) -> DtsymResult<PathBuf> {
        if let Some(pinned) = &self.config.pinned_client_path {
            if !pinned.as_os_str().is_empty() {
                warn!(
                    "DEPRECATION WARNING: a client path doesn't need to be specified anymore, \
                     the DTXDssClient is downloaded and updated automatically"
                );
                return Ok(pinned.clone());
            }
        }

        let descriptor = match fetch_client_descriptor(&self.config).await {
            Ok(descriptor) => descriptor,
            Err(err) => return self.fallback_or_raise(err),
        };

        // Without the cache directory there is nothing to fall back to, so
        // failing to create it is fatal rather than absorbable.
        fs::create_dir_all(&self.config.cache_dir).map_err(|source| {
            DtsymError::CacheDirCreate {
                path: self.config.cache_dir.clone(),
                source,
            }
        })?;

        if self.is_current(&descriptor.dss_client_url) {
            debug!("Cached client already matches the remote descriptor");
            return Ok(self.binary_path());
        }

        let _lock = match CacheLock::acquire(&self.config.cache_dir).await {
            Ok(lock) => lock,
            Err(err) if err.recoverable() => return self.fallback_or_raise(err),
            Err(err) => return Err(err),
        };

        // Another process may have finished the same update while we
        // waited for the lock.
        if self.is_current(&descriptor.dss_client_url) {
            debug!("Cached client was updated while waiting for the lock");
            return Ok(self.binary_path());
        }

        info!("Found a different remote DTXDssClient. Updating the local copy.");
        match self.install(&descriptor.dss_client_url).await {
            Ok(()) => Ok(self.binary_path()),
            Err(err) if err.recoverable() => self.fallback_or_raise(err),
            Err(err) => Err(err),
        }
    }

    /// True when marker and binary both exist, the binary is non-empty and
    /// the marker names exactly `remote_url`.
    fn is_current(&self, remote_url: &str) -> bool {
        let binary_size = fs::metadata(self.binary_path())
            .map(|meta| meta.len())
            .unwrap_or(0);
        if binary_size == 0 {
            return false;
        }

        fs::read_to_string(self.marker_path())
            .map(|content| content == remote_url)
            .unwrap_or(false)
    }

    async fn install(&self, artifact_url: &str) -> DtsymResult<()> {
        let archive = download_to_temp(artifact_url).await?;

        // Staged in the cache directory so the final rename stays on one
        // filesystem.
        let mut staged = NamedTempFile::new_in(&self.config.cache_dir)
            .map_err(|e| DtsymError::io("create staging file in cache directory", e))?;

        let found =
            extract_named_entry(archive.path(), &self.config.binary_name, &mut staged)?;
        if !found {
            return Err(DtsymError::ArchiveEntryMissing {
                expected: self.config.binary_name.clone(),
            });
        }

        staged
            .flush()
            .map_err(|e| DtsymError::io("flush staged client binary", e))?;
        make_executable(staged.path())?;

        // The old marker goes first: a marker must never describe a binary
        // from a different install.
        let marker = self.marker_path();
        if marker.exists() {
            let _ = fs::remove_file(&marker);
        }

        staged.persist(self.binary_path()).map_err(|e| {
            DtsymError::io(
                format!("install client binary at {}", self.binary_path().display()),
                e.error,
            )
        })?;

        fs::write(&marker, artifact_url)
            .map_err(|e| DtsymError::io("write version marker", e))?;

        info!(
            "Installed {} from {}",
            self.config.binary_name, artifact_url
        );
        Ok(())
    }

    /// The single decision point for every recoverable failure: return the
    /// cached binary when a usable one exists, otherwise turn the cause
    /// into the terminal error.
    fn fallback_or_raise(&self, err: DtsymError) -> DtsymResult<PathBuf> {
        let binary = self.binary_path();
        let usable = fs::metadata(&binary)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false);

        if usable {
            warn!(
                "{}; using the previously cached client at {}",
                err,
                binary.display()
            );
            Ok(binary)
        } else {
            Err(DtsymError::NoCachedClient {
                cause: format!("{} (environment {})", err, self.config.host_name()),
            })
        }
    }
}

// ============================================================================
// Cache lock
// ============================================================================

/// Name of the lock directory inside the cache directory.
const LOCK_DIR: &str = ".update-lock";

/// Pause between acquisition attempts.
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Bounded wait before giving up on the lock (attempts x delay).
const LOCK_ATTEMPTS: u32 = 50;

/// Locks held longer than this are assumed abandoned by a crashed process.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(600);

/// Advisory cross-process mutex for the cache mutate phase, implemented as
/// a directory because `mkdir` is atomic on every supported platform.
/// Released on drop.
#[derive(Debug)]
struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    async fn acquire(cache_dir: &Path) -> DtsymResult<Self> {
        Self::acquire_with(cache_dir, LOCK_ATTEMPTS).await
    }

    async fn acquire_with(cache_dir: &Path, attempts: u32) -> DtsymResult<Self> {
        let path = cache_dir.join(LOCK_DIR);

        for _ in 0..attempts {
            match fs::create_dir(&path) {
                Ok(()) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path) {
                        warn!("Reclaiming stale cache lock at {}", path.display());
                        let _ = fs::remove_dir(&path);
                        continue;
                    }
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
                Err(source) => {
                    return Err(DtsymError::io(
                        format!("acquire cache lock at {}", path.display()),
                        source,
                    ))
                }
            }
        }

        Err(DtsymError::CacheBusy { path })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = fs::remove_dir(&self.path);
    }
}

fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map(|age| age > LOCK_STALE_AFTER)
        .unwrap_or(false)
}
