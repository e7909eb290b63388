use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

/// Picture bytes on local disk, one file per picture
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the blob directory if it does not exist
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    pub async fn save(&self, name: &str, data: &[u8]) -> io::Result<()> {
        let path = self.path_for(name)?;
        fs::write(&path, data).await?;
        debug!(path = %path.display(), size = data.len(), "Stored picture");
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> io::Result<()> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).await
    }

    /// Names are flat file names; anything that could leave the directory is rejected
    fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid blob name: {name:?}"),
            ));
        }
        Ok(self.dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("pictures"));
        store.init().await.unwrap();

        store.save("a.png", b"png bytes").await.unwrap();
        let path = dir.path().join("pictures/a.png");
        assert_eq!(std::fs::read(&path).unwrap(), b"png bytes");

        store.delete("a.png").await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_delete_missing_blob_fails() {
        let dir = tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf());
        let err = store.delete("missing.png").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf());
        for name in ["", "..", "../escape.png", "nested/a.png"] {
            let err = store.save(name, b"x").await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }
}
