use thiserror::Error;

use br_core::HostAddr;

#[derive(Debug, Error)]
pub enum AgentClientError {
    #[error(transparent)]
    Rpc(#[from] br_rpc::RpcError),

    #[error("host {host} already has an agent at {existing}, cannot also use {requested}")]
    ConflictingAgent { host: String, existing: HostAddr, requested: HostAddr },

    #[error("no agent found for service {0}")]
    NoAgentForService(HostAddr),
}

pub type AgentClientResult<T> = Result<T, AgentClientError>;

impl From<AgentClientError> for br_core::BrError {
    fn from(err: AgentClientError) -> Self {
        br_core::BrError::Transport(err.to_string())
    }
}
