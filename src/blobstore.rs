//! Disk-backed storage for the file-transfer protocol's `GET_FILE`/`PUT_FILE`.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("path escapes the storage root: {0}")]
    PathTraversal(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait BlobStore: Send + Sync {
    fn load(&self, path: &str) -> Result<Vec<u8>, BlobError>;
    fn store(&self, path: &str, bytes: &[u8], mode: u16) -> Result<(), BlobError>;
}

/// Resolves blob paths relative to a root directory on disk. Rejects
/// absolute paths and `..` components so a client can't escape the root.
pub struct DiskBlobStore {
    root: PathBuf,
}

impl DiskBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiskBlobStore { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
        let requested = Path::new(path);
        if requested.is_absolute() {
            return Err(BlobError::PathTraversal(path.to_string()));
        }
        if requested
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(BlobError::PathTraversal(path.to_string()));
        }
        Ok(self.root.join(requested))
    }
}

impl BlobStore for DiskBlobStore {
    fn load(&self, path: &str) -> Result<Vec<u8>, BlobError> {
        let resolved = self.resolve(path)?;
        std::fs::read(&resolved).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(path.to_string())
            } else {
                BlobError::Io(e)
            }
        })
    }

    fn store(&self, path: &str, bytes: &[u8], mode: u16) -> Result<(), BlobError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&resolved, bytes)?;
        apply_permissions(&resolved, mode)?;
        Ok(())
    }
}

#[cfg(unix)]
fn apply_permissions(path: &Path, mode: u16) -> Result<(), BlobError> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = std::fs::Permissions::from_mode(mode as u32);
    std::fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _mode: u16) -> Result<(), BlobError> {
    Ok(())
}
