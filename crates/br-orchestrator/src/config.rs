use br_core::HostAddr;
use br_store::S3Flags;

/// Configuration shared by every orchestrator: where the meta leader is and
/// which external store to use.
///
/// Mirrors `pkg/config/common.go`'s `FlagMetaAddr`/`FlagStorage` pair (the
/// latter is confusingly named: it is the external store *URI*, not a
/// storage-service address).
#[derive(Debug, Clone)]
pub struct CommonConfig {
    pub meta_addr: HostAddr,
    pub store_uri: String,
    pub s3_flags: S3Flags,
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub common: CommonConfig,
    pub spaces: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub common: CommonConfig,
    pub backup_name: String,
}

#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub common: CommonConfig,
    pub backup_name: String,
}

#[derive(Debug, Clone)]
pub struct ShowConfig {
    pub store_uri: String,
    pub s3_flags: S3Flags,
}
