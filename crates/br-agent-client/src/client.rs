use std::time::Duration;

use br_core::HostAddr;
use br_rpc::FramedChannel;

use crate::error::AgentClientResult;
use crate::wire::*;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// RPC client for a single per-host agent.
pub struct AgentClient {
    channel: FramedChannel,
}

impl AgentClient {
    pub async fn connect(addr: HostAddr) -> AgentClientResult<Self> {
        let channel = FramedChannel::connect(addr, CONNECT_TIMEOUT).await?;
        Ok(Self { channel })
    }

    pub fn addr(&self) -> &HostAddr {
        self.channel.addr()
    }

    pub async fn upload_file(
        &self,
        local_path: impl Into<String>,
        remote_path: impl Into<String>,
        store_uri: impl Into<String>,
        recursively: bool,
    ) -> AgentClientResult<()> {
        let req = UploadFileRequest {
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            store_uri: store_uri.into(),
            recursively,
        };
        let _resp: UploadFileResponse = self.channel.call(&req).await?;
        Ok(())
    }

    pub async fn download_file(
        &self,
        remote_path: impl Into<String>,
        local_path: impl Into<String>,
        store_uri: impl Into<String>,
        recursively: bool,
    ) -> AgentClientResult<()> {
        let req = DownloadFileRequest {
            remote_path: remote_path.into(),
            local_path: local_path.into(),
            store_uri: store_uri.into(),
            recursively,
        };
        let _resp: DownloadFileResponse = self.channel.call(&req).await?;
        Ok(())
    }

    pub async fn move_dir(
        &self,
        src_path: impl Into<String>,
        dst_path: impl Into<String>,
    ) -> AgentClientResult<()> {
        let req = MoveDirRequest { src_path: src_path.into(), dst_path: dst_path.into() };
        let _resp: MoveDirResponse = self.channel.call(&req).await?;
        Ok(())
    }

    pub async fn remove_dir(&self, path: impl Into<String>) -> AgentClientResult<()> {
        let req = RemoveDirRequest { path: path.into() };
        let _resp: RemoveDirResponse = self.channel.call(&req).await?;
        Ok(())
    }

    pub async fn exist_dir(&self, path: impl Into<String>) -> AgentClientResult<bool> {
        let req = ExistDirRequest { path: path.into() };
        let resp: ExistDirResponse = self.channel.call(&req).await?;
        Ok(resp.exist)
    }

    pub async fn start_service(
        &self,
        kind: ServiceKind,
        root_dir: impl Into<String>,
    ) -> AgentClientResult<()> {
        let req = StartServiceRequest { kind, root_dir: root_dir.into() };
        let _resp: StartServiceResponse = self.channel.call(&req).await?;
        Ok(())
    }

    pub async fn stop_service(
        &self,
        kind: ServiceKind,
        root_dir: impl Into<String>,
    ) -> AgentClientResult<()> {
        let req = StopServiceRequest { kind, root_dir: root_dir.into() };
        let _resp: StopServiceResponse = self.channel.call(&req).await?;
        Ok(())
    }

    pub async fn service_status(
        &self,
        kind: ServiceKind,
        root_dir: impl Into<String>,
    ) -> AgentClientResult<ServiceStatusValue> {
        let req = ServiceStatusRequest { kind, root_dir: root_dir.into() };
        let resp: ServiceStatusResponse = self.channel.call(&req).await?;
        Ok(resp.status)
    }
}
