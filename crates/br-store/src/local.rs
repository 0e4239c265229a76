use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{ExternalStore, SubBackend};

pub const SCHEME: &str = "local";

/// Filesystem-backed store. "Local" here means each cluster host's own
/// disk, not a single shared volume the orchestrator process can see —
/// `upload`/`download` exist only for the small manifest file; bulk data
/// movement always goes through an agent against the path returned by
/// [`LocalStore::get_dir`].
pub struct LocalStore;

impl LocalStore {
    pub fn new() -> Self {
        Self
    }

    fn path_from_uri(uri: &str) -> StoreResult<PathBuf> {
        let rest = uri.strip_prefix("local://").ok_or_else(|| {
            StoreError::InvalidUri(uri.to_string(), "missing local:// prefix".into())
        })?;
        if rest.is_empty() {
            return Err(StoreError::InvalidUri(uri.to_string(), "empty path".into()));
        }
        Ok(PathBuf::from(rest))
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExternalStore for LocalStore {
    async fn ensure_dir(&self, uri: &str, must_not_exist: bool) -> StoreResult<()> {
        let path = Self::path_from_uri(uri)?;
        if must_not_exist && path.exists() {
            return Err(StoreError::AlreadyExists { uri: uri.to_string() });
        }
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| StoreError::Io { path: path.display().to_string(), source })
    }

    async fn exist_dir(&self, uri: &str) -> StoreResult<bool> {
        let path = Self::path_from_uri(uri)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }

    async fn list_dir(&self, uri: &str) -> StoreResult<Vec<String>> {
        let path = Self::path_from_uri(uri)?;
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|source| StoreError::Io { path: path.display().to_string(), source })?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::Io { path: path.display().to_string(), source })?
        {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn upload(&self, remote_uri: &str, local_path: &Path, overwrite: bool) -> StoreResult<()> {
        let dst = Self::path_from_uri(remote_uri)?;
        if !overwrite && dst.exists() {
            return Err(StoreError::AlreadyExists { uri: remote_uri.to_string() });
        }
        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io { path: parent.display().to_string(), source })?;
        }
        debug!(from = %local_path.display(), to = %dst.display(), "copying file into local store");
        tokio::fs::copy(local_path, &dst)
            .await
            .map_err(|source| StoreError::Io { path: dst.display().to_string(), source })?;
        Ok(())
    }

    async fn download(&self, local_path: &Path, remote_uri: &str, overwrite: bool) -> StoreResult<()> {
        let src = Self::path_from_uri(remote_uri)?;
        if !overwrite && local_path.exists() {
            return Err(StoreError::AlreadyExists { uri: local_path.display().to_string() });
        }
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io { path: parent.display().to_string(), source })?;
        }
        tokio::fs::copy(&src, local_path)
            .await
            .map_err(|source| StoreError::Io { path: src.display().to_string(), source })?;
        Ok(())
    }

    async fn remove_dir(&self, uri: &str) -> StoreResult<()> {
        let path = Self::path_from_uri(uri)?;
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path: path.display().to_string(), source }),
        }
    }

    fn get_dir(&self, uri: &str) -> SubBackend {
        SubBackend::new(uri)
    }

    fn scheme(&self) -> &'static str {
        SCHEME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_dir_rejects_existing_when_required_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let uri = format!("local://{}/BACKUP_1", tmp.path().display());
        let store = LocalStore::new();
        store.ensure_dir(&uri, true).await.unwrap();
        let err = store.ensure_dir(&uri, true).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn upload_then_download_round_trips_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new();
        let local_src = tmp.path().join("manifest.bin");
        tokio::fs::write(&local_src, b"hello manifest").await.unwrap();

        let remote_uri = format!("local://{}/BACKUP_1/BACKUP_1.meta", tmp.path().display());
        store.upload(&remote_uri, &local_src, false).await.unwrap();

        let local_dst = tmp.path().join("downloaded.bin");
        store.download(&local_dst, &remote_uri, false).await.unwrap();
        let contents = tokio::fs::read(&local_dst).await.unwrap();
        assert_eq!(contents, b"hello manifest");
    }

    #[tokio::test]
    async fn remove_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let uri = format!("local://{}/BACKUP_1", tmp.path().display());
        let store = LocalStore::new();
        store.ensure_dir(&uri, true).await.unwrap();
        store.remove_dir(&uri).await.unwrap();
        store.remove_dir(&uri).await.unwrap();
    }
}
