use std::path::Path;

use async_trait::async_trait;

use crate::error::StoreResult;

/// An opaque handle to a sub-path of a store, resolvable by an agent on its
/// own host without routing bytes through the orchestrator process.
///
/// For the `local` scheme this is a filesystem path each agent can open
/// directly; for `s3` it is the bucket/key prefix the agent's own upload
/// call should target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubBackend {
    pub uri: String,
}

impl SubBackend {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// URI-addressed external storage, used by the orchestrator for directory
/// bookkeeping and small file transfers (the manifest). Bulk data transfer
/// is always driven by an agent against a [`SubBackend`] handle, never
/// routed through this trait's `upload`/`download`.
#[async_trait]
pub trait ExternalStore: Send + Sync {
    async fn ensure_dir(&self, uri: &str, must_not_exist: bool) -> StoreResult<()>;
    async fn exist_dir(&self, uri: &str) -> StoreResult<bool>;
    async fn list_dir(&self, uri: &str) -> StoreResult<Vec<String>>;
    async fn upload(&self, remote_uri: &str, local_path: &Path, overwrite: bool) -> StoreResult<()>;
    async fn download(&self, local_path: &Path, remote_uri: &str, overwrite: bool) -> StoreResult<()>;
    async fn remove_dir(&self, uri: &str) -> StoreResult<()>;
    fn get_dir(&self, uri: &str) -> SubBackend;
    /// The URI scheme this store was constructed for (`"local"` or `"s3"`).
    fn scheme(&self) -> &'static str;
}
