use serde::{Deserialize, Serialize};

use br_core::HostAddr;

/// A storage service's checkpoint for one space at one data-dir index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Path relative to the store layout, e.g. `data0/3/`.
    pub path: String,
    pub partition_info: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostBackup {
    pub host: HostAddr,
    pub checkpoints: Vec<Checkpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceBackup {
    pub space_id: i32,
    pub space_name: String,
    pub partition_num: i32,
    pub replica_factor: i32,
    pub host_backups: Vec<HostBackup>,
}

/// The sidecar manifest written at the end of a backup and read at the
/// start of restore/show. Self-contained: every field needed to restore
/// or display the backup lives here, no external references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub backup_name: String,
    pub create_time_ms: i64,
    pub full: bool,
    pub all_spaces: bool,
    pub base_backup_name: String,
    /// Basenames only (no directory components) — see `normalize`.
    pub meta_files: Vec<String>,
    pub space_backups: Vec<SpaceBackup>,
    pub storage_hosts: Vec<HostAddr>,
}

impl Manifest {
    /// Strips directory components from every meta-sst entry so the
    /// manifest never embeds an absolute or host-local path, matching the
    /// original tool's `filepath.Base` normalization on write.
    pub fn normalize(mut self) -> Self {
        self.meta_files = self
            .meta_files
            .into_iter()
            .map(|f| {
                std::path::Path::new(&f)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .unwrap_or(f)
            })
            .collect();
        self
    }
}
