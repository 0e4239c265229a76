use thiserror::Error;

use br_core::HostAddr;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Core(#[from] br_core::BrError),

    #[error(transparent)]
    Meta(#[from] br_meta_client::MetaClientError),

    #[error(transparent)]
    Agent(#[from] br_agent_client::AgentClientError),

    #[error(transparent)]
    Store(#[from] br_store::StoreError),

    #[error(transparent)]
    Codec(#[from] br_manifest::CodecError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("topology mismatch: cluster has {cluster_storage_count} storages ({cluster_distribution:?}), backup has {backup_storage_count} ({backup_distribution:?})")]
    TopologyMismatch {
        cluster_storage_count: usize,
        backup_storage_count: usize,
        cluster_distribution: std::collections::BTreeMap<usize, usize>,
        backup_distribution: std::collections::BTreeMap<usize, usize>,
    },

    #[error("space {name} exists with id {cluster_id}, but backup expects id {backup_id}")]
    SpaceMismatch { name: String, cluster_id: i32, backup_id: i32 },

    #[error("backup {0} not found")]
    BackupNotFound(String),

    #[error("a task in the group failed and the rest were cancelled: {0}")]
    TaskGroup(String),

    #[error("gave up on {action} after {attempts} attempts: {last_error}")]
    RetriesExhausted { action: String, attempts: u32, last_error: String },
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Outcome of a backup attempt: the partial or final backup name travels
/// with both success and failure so the caller can always run Cleanup.
#[derive(Debug)]
pub struct BackupOutcome {
    pub backup_name: Option<String>,
    pub result: OrchestratorResult<()>,
}

impl OrchestratorError {
    pub fn host_context(self, phase: &str, addr: &HostAddr) -> Self {
        OrchestratorError::TaskGroup(format!("{phase} failed for host {addr}: {self}"))
    }
}
