use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use br_core::HostAddr;
use br_rpc::FramedChannel;

use crate::error::{MetaClientError, MetaClientResult};
use crate::wire::*;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RESTORE_META_RETRIES: u32 = 3;
const RESTORE_META_RETRY_DELAY: Duration = Duration::from_secs(2);
const MAX_LEADER_REDIRECTS: u32 = 5;

struct Inner {
    channel: FramedChannel,
    leader_addr: HostAddr,
}

/// Client for the meta service that transparently follows leader changes.
///
/// Mirrors the original tool's behavior: most calls retry in place when the
/// response reports the leader moved, reconnecting to the new leader and
/// resubmitting the same request. `restore_meta` is the one exception,
/// addressing a specific metad node directly rather than the leader.
pub struct MetaClient {
    inner: RwLock<Inner>,
}

impl MetaClient {
    pub async fn connect(addr: HostAddr) -> MetaClientResult<Self> {
        let channel = FramedChannel::connect(addr.clone(), CONNECT_TIMEOUT).await?;
        Ok(Self { inner: RwLock::new(Inner { channel, leader_addr: addr }) })
    }

    pub async fn leader_addr(&self) -> HostAddr {
        self.inner.read().await.leader_addr.clone()
    }

    async fn reconnect(&self, new_leader: Option<HostAddr>) -> MetaClientResult<()> {
        let new_leader = new_leader.ok_or(MetaClientError::NoLeader)?;
        info!(leader = %new_leader, "meta leader changed, reconnecting");
        let channel = FramedChannel::connect(new_leader.clone(), CONNECT_TIMEOUT).await?;
        let mut inner = self.inner.write().await;
        inner.channel = channel;
        inner.leader_addr = new_leader;
        Ok(())
    }

    /// Calls `request` against the current leader, following `LeaderChanged`
    /// responses until `extract_leader_retry` reports the call has settled.
    /// Gives up after `MAX_LEADER_REDIRECTS` hops to avoid ping-ponging
    /// forever between two nodes that disagree about who the leader is.
    async fn call_following_leader<Req, Resp>(
        &self,
        request: &Req,
        code_of: impl Fn(&Resp) -> ErrorCode,
        leader_of: impl Fn(&Resp) -> Option<HostAddr>,
    ) -> MetaClientResult<Resp>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        for _ in 0..MAX_LEADER_REDIRECTS {
            let resp: Resp = {
                let inner = self.inner.read().await;
                inner.channel.call(request).await?
            };
            if code_of(&resp) == ErrorCode::LeaderChanged {
                self.reconnect(leader_of(&resp)).await?;
                continue;
            }
            return Ok(resp);
        }
        Err(MetaClientError::TooManyRedirects { attempts: MAX_LEADER_REDIRECTS })
    }

    pub async fn list_cluster(&self) -> MetaClientResult<ListClusterInfoResp> {
        let mut resp: ListClusterInfoResp = self
            .call_following_leader(&ListClusterInfoReq, |r| r.code, |r| r.leader.clone())
            .await?;
        if resp.code != ErrorCode::Succeeded {
            return Err(MetaClientError::Rejected(resp.code));
        }

        for services in resp.host_services.values_mut() {
            for svc in services.iter_mut() {
                if svc.role == br_core::ServiceRole::Meta && svc.dir.is_none() {
                    svc.dir = Some(self.get_meta_dir(&svc.addr).await?);
                }
            }
        }
        Ok(resp)
    }

    pub async fn create_backup(&self, spaces: Vec<String>) -> MetaClientResult<CreateBackupResp> {
        let req = CreateBackupReq { spaces };
        self.call_following_leader(&req, |r| r.code, |r| r.leader.clone()).await
    }

    pub async fn drop_backup(&self, name: String) -> MetaClientResult<()> {
        let req = DropSnapshotReq { name };
        let resp: DropSnapshotResp =
            self.call_following_leader(&req, |r| r.code, |r| r.leader.clone()).await?;
        match resp.code {
            ErrorCode::Succeeded => Ok(()),
            code => Err(MetaClientError::Rejected(code)),
        }
    }

    /// `SpaceNotFound` is a legitimate outcome the caller needs to see (it
    /// means "go ahead, nothing to drop"), so only a code that is neither
    /// success nor not-found is treated as a rejection.
    pub async fn get_space(&self, space_name: String) -> MetaClientResult<GetSpaceResp> {
        let req = GetSpaceReq { space_name };
        let resp: GetSpaceResp =
            self.call_following_leader(&req, |r| r.code, |r| r.leader.clone()).await?;
        match resp.code {
            ErrorCode::Succeeded | ErrorCode::SpaceNotFound => Ok(resp),
            code => Err(MetaClientError::Rejected(code)),
        }
    }

    pub async fn drop_space(&self, space_name: String, if_exists: bool) -> MetaClientResult<()> {
        let req = DropSpaceReq { space_name, if_exists };
        let resp: DropSpaceResp =
            self.call_following_leader(&req, |r| r.code, |r| r.leader.clone()).await?;
        match resp.code {
            ErrorCode::Succeeded => Ok(()),
            code => Err(MetaClientError::Rejected(code)),
        }
    }

    /// Restores a single metad node directly. Unlike the other calls this
    /// does not follow the leader: the target is an arbitrary metad that
    /// may not even be part of a quorum yet, so it is addressed by its own
    /// address and retried a fixed number of times on connect failure.
    pub async fn restore_meta(
        &self,
        meta_addr: HostAddr,
        hosts: Vec<HostPair>,
        files: Vec<String>,
    ) -> MetaClientResult<()> {
        let req = RestoreMetaReq { hosts, files };

        for attempt in 1..=RESTORE_META_RETRIES {
            let channel = match FramedChannel::connect(meta_addr.clone(), CONNECT_TIMEOUT).await {
                Ok(channel) => channel,
                Err(err) => {
                    warn!(addr = %meta_addr, attempt, error = %err, "connect to metad failed");
                    tokio::time::sleep(RESTORE_META_RETRY_DELAY).await;
                    continue;
                }
            };

            let resp: RestoreMetaResp = channel.call(&req).await?;
            return match resp.code {
                ErrorCode::Succeeded => Ok(()),
                code => Err(MetaClientError::Rejected(code)),
            };
        }

        Err(MetaClientError::ReconnectExhausted { attempts: RESTORE_META_RETRIES })
    }

    async fn get_meta_dir(&self, addr: &HostAddr) -> MetaClientResult<DirInfo> {
        debug!(addr = %addr, "fetching meta dir info");
        let channel = FramedChannel::connect(addr.clone(), CONNECT_TIMEOUT).await?;
        let resp: GetMetaDirInfoResp = channel.call(&GetMetaDirInfoReq).await?;
        match resp.code {
            ErrorCode::Succeeded => {
                resp.dir.ok_or_else(|| MetaClientError::Rejected(ErrorCode::Other(-1)))
            }
            code => Err(MetaClientError::Rejected(code)),
        }
    }
}
