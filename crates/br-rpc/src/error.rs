use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error talking to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u32, max: u32 },

    #[error("failed to encode request: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[source] bincode::Error),

    #[error("connection to {addr} closed by peer")]
    ClosedByPeer { addr: String },

    #[error("rpc call to {addr} timed out")]
    Timeout { addr: String },
}

pub type RpcResult<T> = Result<T, RpcError>;
