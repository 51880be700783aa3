//! Supporting-document acceptance and the storage seam behind it.
//!
//! The resolver enforces the acceptance policy (size cap, extension
//! whitelist) and hands the bytes to a [`DocumentStore`]. It returns an
//! opaque reference the claim carries; everything about where bytes actually
//! live stays behind the trait.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::ValidationError;

/// Largest supporting document accepted with a claim.
pub const MAX_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "docx", "jpg", "jpeg", "png"];

/// Opaque reference to a stored document. Always non-empty when attached to
/// a claim; absence is modeled as `Option`, never as an empty string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef(pub String);

#[derive(Clone, Debug)]
pub struct DocumentPolicy {
    pub max_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl Default for DocumentPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: MAX_DOCUMENT_BYTES,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl DocumentPolicy {
    pub fn check(&self, file_name: &str, size_bytes: u64) -> Result<(), ValidationError> {
        if size_bytes == 0 {
            return Err(ValidationError::EmptyDocument { file_name: file_name.to_string() });
        }

        if size_bytes > self.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                file_name: file_name.to_string(),
                size_bytes,
                max_bytes: self.max_size_bytes,
            });
        }

        let extension = extension_of(file_name);
        if !self.allowed_extensions.iter().any(|allowed| allowed == &extension) {
            return Err(ValidationError::UnsupportedType {
                file_name: file_name.to_string(),
                extension,
            });
        }

        Ok(())
    }
}

fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

// Client-supplied names may carry path separators; only the final component
// participates in the stored name.
fn base_name(file_name: &str) -> &str {
    file_name.rsplit(['/', '\\']).next().unwrap_or(file_name)
}

#[derive(Debug, Error)]
#[error("document store failure: {0}")]
pub struct DocumentStoreError(pub String);

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save(&self, stored_name: &str, content: &[u8]) -> Result<(), DocumentStoreError>;
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl InMemoryDocumentStore {
    pub fn stored(&self) -> Vec<(String, Vec<u8>)> {
        match self.documents.lock() {
            Ok(documents) => documents.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn save(&self, stored_name: &str, content: &[u8]) -> Result<(), DocumentStoreError> {
        match self.documents.lock() {
            Ok(mut documents) => documents.push((stored_name.to_string(), content.to_vec())),
            Err(poisoned) => {
                poisoned.into_inner().push((stored_name.to_string(), content.to_vec()))
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DocumentAcceptError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

pub struct DocumentResolver<S> {
    policy: DocumentPolicy,
    store: S,
}

impl<S> DocumentResolver<S>
where
    S: DocumentStore,
{
    pub fn new(store: S) -> Self {
        Self { policy: DocumentPolicy::default(), store }
    }

    pub fn with_policy(store: S, policy: DocumentPolicy) -> Self {
        Self { policy, store }
    }

    /// Validates the upload and persists it under a unique stored name
    /// (`<uuid>_<original name>`), returning the reference a claim carries.
    pub async fn accept(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> Result<DocumentRef, DocumentAcceptError> {
        let file_name = base_name(file_name);
        self.policy.check(file_name, content.len() as u64)?;

        let stored_name = format!("{}_{}", Uuid::new_v4(), file_name);
        self.store.save(&stored_name, content).await?;

        Ok(DocumentRef(stored_name))
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::ValidationError;

    use super::{DocumentAcceptError, DocumentResolver, InMemoryDocumentStore, MAX_DOCUMENT_BYTES};

    fn resolver() -> DocumentResolver<InMemoryDocumentStore> {
        DocumentResolver::new(InMemoryDocumentStore::default())
    }

    #[tokio::test]
    async fn accepts_a_pdf_within_the_size_cap() {
        let store = InMemoryDocumentStore::default();
        let resolver = DocumentResolver::new(store.clone());
        let content = vec![0u8; 2 * 1024 * 1024];

        let reference =
            resolver.accept("timesheet.pdf", &content).await.expect("2 MiB pdf is acceptable");

        assert!(!reference.0.is_empty());
        assert!(reference.0.ends_with("_timesheet.pdf"));

        let stored = store.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, reference.0);
        assert_eq!(stored[0].1.len(), content.len());
    }

    #[tokio::test]
    async fn accepts_a_file_at_exactly_the_size_cap() {
        let content = vec![0u8; MAX_DOCUMENT_BYTES as usize];
        resolver().accept("scan.png", &content).await.expect("cap is inclusive");
    }

    #[tokio::test]
    async fn rejects_oversized_files_without_storing_them() {
        let store = InMemoryDocumentStore::default();
        let resolver = DocumentResolver::new(store.clone());
        let content = vec![0u8; 6 * 1024 * 1024];

        let error = resolver.accept("timesheet.pdf", &content).await.expect_err("6 MiB is too big");

        assert!(matches!(
            error,
            DocumentAcceptError::Validation(ValidationError::FileTooLarge { .. })
        ));
        assert!(store.stored().is_empty());
    }

    #[tokio::test]
    async fn rejects_unsupported_extensions() {
        let error =
            resolver().accept("payload.exe", b"MZ").await.expect_err("exe is not acceptable");

        assert!(matches!(
            error,
            DocumentAcceptError::Validation(ValidationError::UnsupportedType { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_names_without_an_extension() {
        let error = resolver().accept("timesheet", b"data").await.expect_err("no extension");

        assert!(matches!(
            error,
            DocumentAcceptError::Validation(ValidationError::UnsupportedType { extension, .. })
                if extension.is_empty()
        ));
    }

    #[tokio::test]
    async fn rejects_empty_uploads() {
        let error = resolver().accept("empty.pdf", b"").await.expect_err("nothing to store");

        assert!(matches!(
            error,
            DocumentAcceptError::Validation(ValidationError::EmptyDocument { .. })
        ));
    }

    #[tokio::test]
    async fn extension_matching_ignores_case() {
        resolver().accept("REPORT.PDF", b"%PDF-1.7").await.expect("upper-case extension");
    }

    #[tokio::test]
    async fn strips_path_components_from_client_names() {
        let reference = resolver()
            .accept("../../tmp/escape.pdf", b"%PDF-1.7")
            .await
            .expect("name is sanitized, not rejected");

        assert!(reference.0.ends_with("_escape.pdf"));
        assert!(!reference.0.contains('/'));
    }
}
