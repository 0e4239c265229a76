use serde::{Deserialize, Serialize};

use br_core::HostAddr;

/// Mirrors the subset of `nebula::ErrorCode` this client cares about. Any
/// code the meta service returns that isn't one of these collapses to
/// `Other`, carrying its numeric value for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Succeeded,
    LeaderChanged,
    SpaceNotFound,
    Other(i32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirInfo {
    pub root: String,
    pub data: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfoWire {
    pub addr: HostAddr,
    pub role: br_core::ServiceRole,
    pub dir: Option<DirInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListClusterInfoReq;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListClusterInfoResp {
    pub code: ErrorCode,
    pub leader: Option<HostAddr>,
    pub host_services: std::collections::HashMap<String, Vec<ServiceInfoWire>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBackupReq {
    pub spaces: Vec<String>,
}

/// The meta service returns the same manifest shape it expects to be
/// handed back at restore time, so `CreateBackupResp` reuses
/// `br_manifest::Manifest` rather than a parallel response type (grounded
/// in the original tool sharing one `BackupMeta` Thrift struct for both
/// purposes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBackupResp {
    pub code: ErrorCode,
    pub leader: Option<HostAddr>,
    pub meta: Option<br_manifest::Manifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropSnapshotReq {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropSnapshotResp {
    pub code: ErrorCode,
    pub leader: Option<HostAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSpaceReq {
    pub space_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSpaceResp {
    pub code: ErrorCode,
    pub leader: Option<HostAddr>,
    pub space_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropSpaceReq {
    pub space_name: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropSpaceResp {
    pub code: ErrorCode,
    pub leader: Option<HostAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostPair {
    pub from_host: HostAddr,
    pub to_host: HostAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreMetaReq {
    pub hosts: Vec<HostPair>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreMetaResp {
    pub code: ErrorCode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetMetaDirInfoReq;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMetaDirInfoResp {
    pub code: ErrorCode,
    pub dir: Option<DirInfo>,
}
