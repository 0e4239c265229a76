//! URI-addressed external storage abstraction for backup artifacts.

mod config;
mod error;
mod local;
mod s3;
mod store;

pub use config::S3Flags;
pub use error::{StoreError, StoreResult};
pub use local::LocalStore;
pub use s3::S3Store;
pub use store::{ExternalStore, SubBackend};

/// Opens the store backend named by `uri`'s scheme. `local://` and `s3://`
/// are the only schemes implemented; any other scheme (the original tool
/// also supported `hdfs://`/`oss://`) is rejected.
pub async fn open_store(
    uri: &str,
    s3_flags: &S3Flags,
) -> StoreResult<Box<dyn ExternalStore>> {
    let scheme = uri
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .ok_or_else(|| StoreError::InvalidUri(uri.to_string(), "missing scheme".into()))?;

    match scheme {
        local::SCHEME => Ok(Box::new(LocalStore::new())),
        s3::SCHEME => {
            let store = S3Store::from_flags(
                s3_flags.endpoint.as_deref(),
                s3_flags.region.as_deref(),
                s3_flags.access_key.as_deref(),
                s3_flags.secret_key.as_deref(),
            )
            .await?;
            Ok(Box::new(store))
        }
        other => Err(StoreError::UnsupportedScheme(other.to_string())),
    }
}
