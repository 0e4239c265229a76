use thiserror::Error;

/// Crate-wide error umbrella.
///
/// Mirrors the error-handling design in spec.md §7: orchestrators fail fast
/// and wrap the underlying cause with the phase/affected-host context at the
/// call site, then let it bubble up as one of these variants.
#[derive(Debug, Error)]
pub enum BrError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("meta service rejected the request with code {code}")]
    MetaRejected { code: String },

    #[error("no leader available for meta service")]
    NoLeader,

    #[error("topology error: {0}")]
    Topology(String),

    #[error("state error: {0}")]
    State(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type BrResult<T> = Result<T, BrError>;
