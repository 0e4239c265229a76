use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{ExternalStore, SubBackend};

pub const SCHEME: &str = "s3";

/// Parsed `s3://bucket/key/prefix` uri.
struct S3Uri {
    bucket: String,
    key: String,
}

fn parse_uri(uri: &str) -> StoreResult<S3Uri> {
    let rest = uri
        .strip_prefix("s3://")
        .ok_or_else(|| StoreError::InvalidUri(uri.to_string(), "missing s3:// prefix".into()))?;
    let (bucket, key) = rest
        .split_once('/')
        .ok_or_else(|| StoreError::InvalidUri(uri.to_string(), "missing bucket/key".into()))?;
    if bucket.is_empty() {
        return Err(StoreError::InvalidUri(uri.to_string(), "empty bucket".into()));
    }
    Ok(S3Uri { bucket: bucket.to_string(), key: key.trim_end_matches('/').to_string() })
}

/// S3-backed store built on `aws-sdk-s3`. "Directories" do not exist in S3;
/// they are simulated with `/`-delimited key prefixes and a zero-byte
/// marker object, the same convention most S3-facing tools use.
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from explicit endpoint/region/credential overrides,
    /// mirroring the `--s3.endpoint` / `--s3.region` / `--s3.access_key` /
    /// `--s3.secret_key` CLI flags.
    pub async fn from_flags(
        endpoint: Option<&str>,
        region: Option<&str>,
        access_key: Option<&str>,
        secret_key: Option<&str>,
    ) -> StoreResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_sdk_s3::config::Region::new(region.to_string()));
        }
        if let (Some(access_key), Some(secret_key)) = (access_key, secret_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "nebula-br-cli-flags",
            ));
        }
        let shared_config = loader.load().await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = endpoint {
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }
        Ok(Self::new(Client::from_conf(s3_config.build())))
    }

    fn marker_key(key: &str) -> String {
        if key.is_empty() {
            String::new()
        } else {
            format!("{key}/.keep")
        }
    }
}

#[async_trait]
impl ExternalStore for S3Store {
    async fn ensure_dir(&self, uri: &str, must_not_exist: bool) -> StoreResult<()> {
        let parsed = parse_uri(uri)?;
        if must_not_exist && self.exist_dir(uri).await? {
            return Err(StoreError::AlreadyExists { uri: uri.to_string() });
        }
        self.client
            .put_object()
            .bucket(&parsed.bucket)
            .key(Self::marker_key(&parsed.key))
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        Ok(())
    }

    async fn exist_dir(&self, uri: &str) -> StoreResult<bool> {
        let parsed = parse_uri(uri)?;
        let prefix = if parsed.key.is_empty() { String::new() } else { format!("{}/", parsed.key) };
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&parsed.bucket)
            .prefix(&prefix)
            .max_keys(1)
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        Ok(resp.contents().first().is_some() || resp.key_count() > 0)
    }

    async fn list_dir(&self, uri: &str) -> StoreResult<Vec<String>> {
        let parsed = parse_uri(uri)?;
        let prefix = if parsed.key.is_empty() { String::new() } else { format!("{}/", parsed.key) };
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&parsed.bucket)
            .prefix(&prefix)
            .delimiter("/")
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        let mut names = Vec::new();
        for common_prefix in resp.common_prefixes() {
            if let Some(p) = common_prefix.prefix() {
                let trimmed = p.trim_start_matches(&prefix).trim_end_matches('/');
                if !trimmed.is_empty() {
                    names.push(trimmed.to_string());
                }
            }
        }
        Ok(names)
    }

    async fn upload(&self, remote_uri: &str, local_path: &Path, overwrite: bool) -> StoreResult<()> {
        let parsed = parse_uri(remote_uri)?;
        if !overwrite
            && self
                .client
                .head_object()
                .bucket(&parsed.bucket)
                .key(&parsed.key)
                .send()
                .await
                .is_ok()
        {
            return Err(StoreError::AlreadyExists { uri: remote_uri.to_string() });
        }
        debug!(from = %local_path.display(), bucket = %parsed.bucket, key = %parsed.key, "uploading to s3");
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|err| StoreError::Io { path: local_path.display().to_string(), source: std::io::Error::other(err) })?;
        self.client
            .put_object()
            .bucket(&parsed.bucket)
            .key(&parsed.key)
            .body(body)
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        Ok(())
    }

    async fn download(&self, local_path: &Path, remote_uri: &str, overwrite: bool) -> StoreResult<()> {
        let parsed = parse_uri(remote_uri)?;
        if !overwrite && local_path.exists() {
            return Err(StoreError::AlreadyExists { uri: local_path.display().to_string() });
        }
        let resp = self
            .client
            .get_object()
            .bucket(&parsed.bucket)
            .key(&parsed.key)
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?
            .into_bytes();
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io { path: parent.display().to_string(), source })?;
        }
        tokio::fs::write(local_path, bytes)
            .await
            .map_err(|source| StoreError::Io { path: local_path.display().to_string(), source })?;
        Ok(())
    }

    async fn remove_dir(&self, uri: &str) -> StoreResult<()> {
        let parsed = parse_uri(uri)?;
        let prefix = if parsed.key.is_empty() { String::new() } else { format!("{}/", parsed.key) };
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&parsed.bucket)
            .prefix(&prefix)
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                self.client
                    .delete_object()
                    .bucket(&parsed.bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|err| StoreError::S3(err.to_string()))?;
            }
        }
        Ok(())
    }

    fn get_dir(&self, uri: &str) -> SubBackend {
        SubBackend::new(uri)
    }

    fn scheme(&self) -> &'static str {
        SCHEME
    }
}
