//! Disk-backed document store for uploaded supporting files.

use std::path::PathBuf;

use async_trait::async_trait;
use claimflow_core::documents::{DocumentStore, DocumentStoreError};

/// Writes accepted uploads into one flat directory. Stored names already
/// carry a UUID prefix, so collisions between callers are not a concern.
#[derive(Clone, Debug)]
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentStore for LocalDiskStore {
    async fn save(&self, stored_name: &str, content: &[u8]) -> Result<(), DocumentStoreError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|error| {
            DocumentStoreError(format!(
                "could not create upload directory `{}`: {error}",
                self.root.display()
            ))
        })?;

        let path = self.root.join(stored_name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|error| DocumentStoreError(format!("could not write `{}`: {error}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use claimflow_core::documents::DocumentStore;
    use tempfile::TempDir;

    use super::LocalDiskStore;

    #[tokio::test]
    async fn saves_content_under_the_stored_name() {
        let dir = TempDir::new().expect("tempdir");
        let store = LocalDiskStore::new(dir.path());

        store.save("abc123_timesheet.pdf", b"%PDF-1.7").await.expect("save");

        let written = tokio::fs::read(dir.path().join("abc123_timesheet.pdf"))
            .await
            .expect("read back");
        assert_eq!(written, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn creates_the_upload_directory_on_first_write() {
        let dir = TempDir::new().expect("tempdir");
        let nested = dir.path().join("uploads").join("claims");
        let store = LocalDiskStore::new(&nested);

        store.save("abc123_register.png", &[0x89, 0x50, 0x4e, 0x47]).await.expect("save");

        assert!(nested.join("abc123_register.png").exists());
    }
}
