use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileRequest {
    pub local_path: String,
    pub remote_path: String,
    /// URI of the external store backend the agent should upload through,
    /// e.g. `s3://bucket/prefix` or `local:///mnt/backups`.
    pub store_uri: String,
    pub recursively: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadFileRequest {
    pub remote_path: String,
    pub local_path: String,
    pub store_uri: String,
    pub recursively: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadFileResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveDirRequest {
    pub src_path: String,
    pub dst_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveDirResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveDirRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveDirResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistDirRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistDirResponse {
    pub exist: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    Metad,
    Storaged,
    Graphd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartServiceRequest {
    pub kind: ServiceKind,
    pub root_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartServiceResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopServiceRequest {
    pub kind: ServiceKind,
    pub root_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopServiceResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatusRequest {
    pub kind: ServiceKind,
    pub root_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatusValue {
    Running,
    Stopped,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatusResponse {
    pub status: ServiceStatusValue,
}
