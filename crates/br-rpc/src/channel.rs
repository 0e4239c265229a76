use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

use br_core::HostAddr;

use crate::error::{RpcError, RpcResult};
use crate::frame::{read_frame, write_frame};

/// Every RPC round trip (write request, read response) is bounded by this
/// timeout, independent of the connect timeout.
const CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// A request/response channel to a single remote service, serializing
/// calls through an internal mutex so the connection can be shared across
/// tasks without each caller managing its own socket.
pub struct FramedChannel {
    addr: HostAddr,
    stream: AsyncMutex<TcpStream>,
}

impl FramedChannel {
    pub async fn connect(addr: HostAddr, timeout: Duration) -> RpcResult<Self> {
        let target = addr.to_string();
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&target))
            .await
            .map_err(|_| RpcError::Connect {
                addr: target.clone(),
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
            })?
            .map_err(|source| RpcError::Connect { addr: target.clone(), source })?;
        stream
            .set_nodelay(true)
            .map_err(|source| RpcError::Connect { addr: target, source })?;
        Ok(Self { addr, stream: AsyncMutex::new(stream) })
    }

    pub fn addr(&self) -> &HostAddr {
        &self.addr
    }

    /// Sends `request` and awaits the matching response, encoding both
    /// ends with `bincode` inside a length-prefixed frame. The whole round
    /// trip is bounded by `CALL_TIMEOUT`, so a peer that accepts the write
    /// but never answers fails instead of hanging the caller forever.
    pub async fn call<Req, Resp>(&self, request: &Req) -> RpcResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = bincode::serialize(request).map_err(RpcError::Encode)?;
        let addr = self.addr.to_string();
        tokio::time::timeout(CALL_TIMEOUT, self.call_inner(&addr, &payload))
            .await
            .map_err(|_| RpcError::Timeout { addr: addr.clone() })?
    }

    async fn call_inner<Resp>(&self, addr: &str, payload: &[u8]) -> RpcResult<Resp>
    where
        Resp: DeserializeOwned,
    {
        let mut stream = self.stream.lock().await;
        trace!(addr = %addr, bytes = payload.len(), "sending rpc frame");
        write_frame(&mut *stream, addr, payload).await?;
        let response = read_frame(&mut *stream, addr).await?;
        bincode::deserialize(&response).map_err(RpcError::Decode)
    }
}
