// src/services/document_store.rs

use std::path::PathBuf;

use async_trait::async_trait;

use crate::common::error::AppError;

/// Onde os PDFs das faturas ficam guardados.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Grava e devolve o caminho que será persistido na fatura.
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<String, AppError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, AppError>;
}

#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<String, AppError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(AppError::DocumentStore(format!("invalid document name '{}'", name)));
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::DocumentStore(e.to_string()))?;

        // Escreve num temporário e renomeia: nunca fica um PDF pela metade
        let target = self.root.join(name);
        let tmp = self.root.join(format!(".{}.tmp", name));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| AppError::DocumentStore(e.to_string()))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| AppError::DocumentStore(e.to_string()))?;

        let absolute = tokio::fs::canonicalize(&target)
            .await
            .map_err(|e| AppError::DocumentStore(e.to_string()))?;

        Ok(absolute.to_string_lossy().into_owned())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, AppError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::DocumentNotFound),
            Err(e) => Err(AppError::DocumentStore(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn writes_under_root_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("invoices"));

        let path = store.write("abc.pdf", b"%PDF-1.7 test").await.unwrap();
        assert!(path.ends_with("abc.pdf"));
        assert!(Path::new(&path).is_absolute());
        assert_eq!(store.read(&path).await.unwrap(), b"%PDF-1.7 test");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let missing = dir.path().join("nope.pdf");
        let err = store.read(&missing.to_string_lossy()).await.unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound));
    }

    #[tokio::test]
    async fn names_with_separators_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let err = store.write("../escape.pdf", b"x").await.unwrap_err();
        assert!(matches!(err, AppError::DocumentStore(_)));
    }
}
