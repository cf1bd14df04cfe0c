//! On-disk asset directories.
//!
//! Staged inputs live under `storage.uploads_dir`, finished videos under
//! `storage.outputs_dir`. Every file gets a fresh UUID v4 name that is
//! reserved with an exclusive create, so concurrent jobs never share a path
//! and no locking is needed.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use zr_core::config::Config;
use zr_core::{AssetId, AssetKind, Error, Result, StagedInput};

/// Attempts before giving up on finding an unused name.
const MAX_ALLOCATE_ATTEMPTS: usize = 8;

/// Extension used when the client filename gives nothing usable.
pub const DEFAULT_INPUT_EXTENSION: &str = "jpg";

#[derive(Debug, Clone)]
pub struct AssetStore {
    uploads_dir: PathBuf,
    outputs_dir: PathBuf,
    public_base_url: String,
}

impl AssetStore {
    /// Create both directories and return a store with absolute paths.
    pub fn open(config: &Config) -> Result<Self> {
        let store = Self {
            uploads_dir: config.storage.uploads_dir.clone(),
            outputs_dir: config.storage.outputs_dir.clone(),
            public_base_url: config.public_base_url(),
        };
        store.ensure_directories()?;

        Ok(Self {
            uploads_dir: store.uploads_dir.canonicalize()?,
            outputs_dir: store.outputs_dir.canonicalize()?,
            ..store
        })
    }

    /// Create any missing asset directory. Safe to call repeatedly.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.uploads_dir, &self.outputs_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                tracing::error!("Failed to create asset directory {}: {e}", dir.display());
                Error::from(e)
            })?;
        }
        Ok(())
    }

    pub fn dir(&self, kind: AssetKind) -> &Path {
        match kind {
            AssetKind::Input => &self.uploads_dir,
            AssetKind::Output => &self.outputs_dir,
        }
    }

    /// Reserve a new, previously unused path of the given kind.
    ///
    /// The returned file exists and is empty.
    pub fn allocate(&self, kind: AssetKind, extension: &str) -> Result<(AssetId, PathBuf)> {
        let dir = self.dir(kind);

        for _ in 0..MAX_ALLOCATE_ATTEMPTS {
            let id = AssetId::new();
            let path = dir.join(format!("{id}.{extension}"));

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok((id, path)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::warn!("Asset name collision on {id}; retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Internal(format!(
            "could not allocate a unique {kind:?} asset after {MAX_ALLOCATE_ATTEMPTS} attempts"
        )))
    }

    /// Externally reachable URL for a file in the outputs directory.
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/outputs/{file_name}", self.public_base_url)
    }

    /// Best-effort removal; a missing file is not an error.
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {e}", path.display()),
        }
    }
}

/// A staged input that is removed from disk unless handed to a job.
///
/// Dropping it (an error, a disconnected client, a rejected job) deletes the
/// file; [`PendingInput::into_staged`] releases it to the caller.
#[derive(Debug)]
pub struct PendingInput {
    staged: StagedInput,
    armed: bool,
}

impl PendingInput {
    pub fn new(staged: StagedInput) -> Self {
        Self {
            staged,
            armed: true,
        }
    }

    pub fn staged(&self) -> &StagedInput {
        &self.staged
    }

    /// Hand the file off; it is no longer removed on drop.
    pub fn into_staged(mut self) -> StagedInput {
        self.armed = false;
        self.staged.clone()
    }
}

impl Drop for PendingInput {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let path = &self.staged.local_path;
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(asset_id = %self.staged.id, "Removed abandoned input"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove abandoned input {}: {e}", path.display()),
        }
    }
}

/// Pick a safe extension from a client-supplied filename.
///
/// Only short ASCII-alphanumeric extensions are kept; anything else falls back
/// to [`DEFAULT_INPUT_EXTENSION`].
pub fn sanitize_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_INPUT_EXTENSION.to_string())
}
