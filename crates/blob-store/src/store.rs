//! Blob persistence under a flat storage root

use crate::error::{Result, StoreError};
use crate::types::{PersistOutcome, StoreStats};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Named blobs stored flat under a single directory
pub struct BlobStore {
    /// Directory holding every blob
    root: PathBuf,
    /// Sequence for unique temporary file names
    tmp_seq: AtomicU64,
    writes: AtomicU64,
    deduplicated: AtomicU64,
    write_failures: AtomicU64,
}

impl BlobStore {
    /// Create a store rooted at `root`. Nothing touches the disk until [`init`](Self::init).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_seq: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deduplicated: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the storage root exists
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        info!(root = ?self.root, "Blob store initialized");
        Ok(())
    }

    /// Make the blob named `filename` hold exactly `bytes`.
    ///
    /// An existing blob with identical content is left alone. Otherwise the
    /// bytes are written to a temporary file in the root and renamed over the
    /// target, so a failed write never leaves a partial blob under `filename`.
    pub async fn persist(&self, filename: &str, bytes: &[u8]) -> Result<PersistOutcome> {
        let path = self.blob_path(filename)?;

        let outcome = match matches_existing(&path, bytes).await {
            Ok(true) => {
                self.deduplicated.fetch_add(1, Ordering::Relaxed);
                debug!(filename, size = bytes.len(), "Blob already up to date");
                return Ok(PersistOutcome::Unchanged);
            }
            Ok(false) => PersistOutcome::Overwritten,
            Err(e) if e.kind() == io::ErrorKind::NotFound => PersistOutcome::Created,
            Err(e) => {
                warn!(filename, error = %e, "Existing blob unreadable, overwriting");
                PersistOutcome::Overwritten
            }
        };

        if let Err(e) = self.write_atomic(&path, bytes).await {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            return Err(e.into());
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!(filename, size = bytes.len(), outcome = ?outcome, "Persisted blob");
        Ok(outcome)
    }

    /// Read the full contents of the blob named `filename`
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(filename)?;
        Ok(fs::read(&path).await?)
    }

    /// Remove the storage root and everything in it
    pub async fn wipe(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                info!(root = ?self.root, "Storage root wiped");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Get current store statistics
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            writes: self.writes.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }

    fn blob_path(&self, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .root
            .join(format!(".tmp.{}.{}", std::process::id(), seq));

        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, path).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }
        result
    }
}

/// Compare the blob at `path` with `bytes`, skipping the read when sizes differ
async fn matches_existing(path: &Path, bytes: &[u8]) -> io::Result<bool> {
    let metadata = fs::metadata(path).await?;
    if !metadata.is_file() || metadata.len() != bytes.len() as u64 {
        return Ok(false);
    }
    let existing = fs::read(path).await?;
    Ok(existing == bytes)
}

/// Blob names are single path components; a leading dot is reserved for temp files
fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\', '\0'])
    {
        return Err(StoreError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}
