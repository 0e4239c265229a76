use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetaClientError {
    #[error(transparent)]
    Rpc(#[from] br_rpc::RpcError),

    #[error("no leader known when calling the meta service")]
    NoLeader,

    #[error("meta service rejected the request: {0:?}")]
    Rejected(crate::wire::ErrorCode),

    #[error("gave up reconnecting to meta leader after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("gave up following leader redirects after {attempts} hops")]
    TooManyRedirects { attempts: u32 },
}

pub type MetaClientResult<T> = Result<T, MetaClientError>;

impl From<MetaClientError> for br_core::BrError {
    fn from(err: MetaClientError) -> Self {
        match err {
            MetaClientError::NoLeader => br_core::BrError::NoLeader,
            MetaClientError::Rejected(code) => {
                br_core::BrError::MetaRejected { code: format!("{code:?}") }
            }
            other => br_core::BrError::Transport(other.to_string()),
        }
    }
}
