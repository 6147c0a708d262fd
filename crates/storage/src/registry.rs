//! Backend selection
//!
//! [`BackendConfig`] names a medium and its settings; [`connect`] turns it
//! into a shared [`StorageBackend`]. Network media need their cargo feature;
//! without it `connect` fails with [`StorageError::BackendUnavailable`]
//! instead of at build time, so one binary can serve every local setup.

use crate::backend::{BackendKind, StorageBackend};
use crate::error::{Result, StorageError};
use crate::local::LocalBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Medium and settings for a storage backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Local filesystem
    #[default]
    Local,
    /// S2 log store
    S2 {
        /// Basin holding the streams
        basin: String,
        /// Bearer token
        access_token: String,
        /// Override for the basin endpoint
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
    /// Redis streams
    Redis {
        /// Connection URL
        url: String,
        /// Prefix for every key
        #[serde(default)]
        key_prefix: String,
        /// Approximate per-stream entry cap
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
    },
}

impl BackendConfig {
    /// Which medium this selects
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Local => BackendKind::Local,
            BackendConfig::S2 { .. } => BackendKind::S2,
            BackendConfig::Redis { .. } => BackendKind::Redis,
        }
    }

    /// Check required settings are present
    pub fn validate(&self) -> Result<()> {
        let missing = |backend, what: &str| StorageError::Misconfigured {
            backend,
            message: format!("{} is required", what),
        };
        match self {
            BackendConfig::Local => Ok(()),
            BackendConfig::S2 {
                basin, access_token, ..
            } => {
                if basin.trim().is_empty() {
                    return Err(missing(BackendKind::S2, "basin"));
                }
                if access_token.trim().is_empty() {
                    return Err(missing(BackendKind::S2, "access token"));
                }
                Ok(())
            }
            BackendConfig::Redis { url, max_len, .. } => {
                if url.trim().is_empty() {
                    return Err(missing(BackendKind::Redis, "url"));
                }
                if *max_len == Some(0) {
                    return Err(StorageError::Misconfigured {
                        backend: BackendKind::Redis,
                        message: "max_len must be positive".into(),
                    });
                }
                Ok(())
            }
        }
    }
}

/// Open the backend described by `config`
pub async fn connect(config: &BackendConfig) -> Result<Arc<dyn StorageBackend>> {
    config.validate()?;
    let backend: Arc<dyn StorageBackend> = match config {
        BackendConfig::Local => Arc::new(LocalBackend::new()),
        BackendConfig::S2 {
            basin,
            access_token,
            endpoint,
        } => connect_s2(basin, access_token, endpoint.as_deref())?,
        BackendConfig::Redis {
            url,
            key_prefix,
            max_len,
        } => connect_redis(url, key_prefix, *max_len).await?,
    };
    info!(backend = %backend.kind(), "storage backend ready");
    Ok(backend)
}

#[cfg(feature = "s2")]
fn connect_s2(
    basin: &str,
    access_token: &str,
    endpoint: Option<&str>,
) -> Result<Arc<dyn StorageBackend>> {
    use crate::log_store::{LogStoreBackend, S2HttpClient};

    let client = match endpoint {
        Some(endpoint) => S2HttpClient::with_endpoint(endpoint, access_token)?,
        None => S2HttpClient::new(basin, access_token)?,
    };
    Ok(Arc::new(LogStoreBackend::new(Arc::new(client))))
}

#[cfg(not(feature = "s2"))]
fn connect_s2(
    _basin: &str,
    _access_token: &str,
    _endpoint: Option<&str>,
) -> Result<Arc<dyn StorageBackend>> {
    Err(StorageError::BackendUnavailable {
        backend: BackendKind::S2,
        hint: "rebuild with `--features s2`".into(),
    })
}

#[cfg(feature = "redis")]
async fn connect_redis(
    url: &str,
    key_prefix: &str,
    max_len: Option<usize>,
) -> Result<Arc<dyn StorageBackend>> {
    use crate::stream::{RedisStreamClient, StreamBackend};

    let client = RedisStreamClient::connect(url).await?;
    let mut backend = StreamBackend::new(Arc::new(client)).with_key_prefix(key_prefix);
    if let Some(max_len) = max_len {
        backend = backend.with_max_len(max_len);
    }
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(
    _url: &str,
    _key_prefix: &str,
    _max_len: Option<usize>,
) -> Result<Arc<dyn StorageBackend>> {
    Err(StorageError::BackendUnavailable {
        backend: BackendKind::Redis,
        hint: "rebuild with `--features redis`".into(),
    })
}
