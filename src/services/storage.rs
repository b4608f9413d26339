use crate::utils::validation::{ValidationError, is_plain_filename, validate_file_size};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncRead;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    TooLarge(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat directory holding uploads and the files produced from them
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_file_size: usize,
}

/// An upload written to a hidden staging path. The file is removed on drop
/// unless it was promoted to its final name.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    size: u64,
    promoted: bool,
}

impl StagedFile {
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.promoted {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove staged upload {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Join a sanitized file name onto the upload directory
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Stream an upload to a unique staging file, enforcing the size limit
    pub async fn stage<R>(&self, reader: R) -> Result<StagedFile, StorageError>
    where
        R: AsyncRead + Unpin,
    {
        let mut staged = StagedFile {
            path: self.root.join(format!(".staging-{}", Uuid::new_v4())),
            size: 0,
            promoted: false,
        };

        let mut file = tokio::fs::File::create(&staged.path).await?;
        let mut limited = tokio::io::AsyncReadExt::take(reader, self.max_file_size as u64 + 1);
        staged.size = tokio::io::copy(&mut limited, &mut file).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;

        validate_file_size(staged.size as usize, self.max_file_size)?;
        Ok(staged)
    }

    /// Move a staged upload to its final name, replacing any previous file
    pub async fn promote(&self, mut staged: StagedFile, filename: &str) -> std::io::Result<PathBuf> {
        let target = self.path_for(filename);
        tokio::fs::rename(&staged.path, &target).await?;
        staged.promoted = true;
        Ok(target)
    }

    pub async fn file_size(&self, path: &Path) -> std::io::Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    /// Resolve a requested download name to a file inside the upload directory.
    ///
    /// Returns `None` when the name is not a plain file name, the file does not
    /// exist, or its canonical path escapes the upload directory.
    pub async fn resolve_download(&self, filename: &str) -> Option<PathBuf> {
        if !is_plain_filename(filename) {
            tracing::warn!("Rejected download outside upload directory: {}", filename);
            return None;
        }

        let root = tokio::fs::canonicalize(&self.root).await.ok()?;
        let path = tokio::fs::canonicalize(self.root.join(filename)).await.ok()?;

        if !path.starts_with(&root) {
            tracing::warn!("Rejected download outside upload directory: {}", filename);
            return None;
        }

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }
}
