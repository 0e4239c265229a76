use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported external store scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid store uri {0}: {1}")]
    InvalidUri(String, String),

    #[error("{uri} already exists")]
    AlreadyExists { uri: String },

    #[error("{uri} not found")]
    NotFound { uri: String },

    #[error("local filesystem error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("s3 error: {0}")]
    S3(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for br_core::BrError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } | StoreError::AlreadyExists { .. } => {
                br_core::BrError::State(err.to_string())
            }
            StoreError::UnsupportedScheme(_) | StoreError::InvalidUri(..) => {
                br_core::BrError::Configuration(err.to_string())
            }
            other => br_core::BrError::Transport(other.to_string()),
        }
    }
}
