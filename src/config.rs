//! Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults (local backend under `.tally`)
//! 2. the nearest `tally.toml`, searched upward from the working directory
//! 3. `TALLY_*` environment variables
//!
//! ```toml
//! [storage]
//! backend = "redis"
//! path = "evals"
//!
//! [storage.redis]
//! url = "redis://localhost:6379"
//! key_prefix = "tally:"
//!
//! [defaults]
//! model = "gpt-4o-mini"
//! temperature = 0.2
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tally_storage::{BackendConfig, BackendKind};
use thiserror::Error;
use tracing::debug;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "tally.toml";

/// Default storage directory, relative to the working directory
pub const DEFAULT_STORAGE_PATH: &str = ".tally";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse {}: {message}", .path.display())]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A setting has an unusable value
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Setting or variable name
        key: String,
        /// What is wrong
        message: String,
    },

    /// The selected backend needs a setting that is not set
    #[error("{backend} backend requires {key}")]
    Missing {
        /// Selected backend
        backend: BackendKind,
        /// Setting or variable to provide
        key: &'static str,
    },
}

/// S2 settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S2Settings {
    /// Basin holding the streams
    pub basin: Option<String>,
    /// Bearer token
    pub access_token: Option<String>,
    /// Endpoint override
    pub endpoint: Option<String>,
}

/// Redis settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    /// Connection URL
    pub url: Option<String>,
    /// Prefix for every key
    pub key_prefix: Option<String>,
    /// Approximate per-stream entry cap
    pub max_len: Option<usize>,
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Selected backend
    pub backend: BackendKind,
    /// Base path (local) or key prefix (log and stream backends)
    pub path: String,
    /// S2 settings
    pub s2: S2Settings,
    /// Redis settings
    pub redis: RedisSettings,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: BackendKind::Local,
            path: DEFAULT_STORAGE_PATH.to_string(),
            s2: S2Settings::default(),
            redis: RedisSettings::default(),
        }
    }
}

/// Defaults handed to evaluation producers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Default judge model
    pub model: Option<String>,
    /// Default sampling temperature
    pub temperature: Option<f64>,
}

/// Full Tally configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Storage settings
    pub storage: StorageConfig,
    /// Producer defaults
    pub defaults: DefaultsConfig,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub working_dir: Option<PathBuf>,
}

/// Walk up from `start` looking for `tally.toml`.
pub fn discover_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

impl TallyConfig {
    /// Load defaults, the nearest config file and the process environment.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        Self::load_with(cwd, |key| std::env::var(key).ok())
    }

    /// Like [`TallyConfig::load`] with an explicit variable lookup
    pub fn load_with<F>(cwd: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match discover_config_file(cwd) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.working_dir = Some(cwd.to_path_buf());
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Defaults plus overrides from `lookup`, without reading any file
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `TALLY_*` overrides
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(raw) = get("TALLY_STORAGE_BACKEND") {
            self.storage.backend = raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "TALLY_STORAGE_BACKEND".into(),
                message,
            })?;
        }
        if let Some(path) = get("TALLY_STORAGE_PATH") {
            self.storage.path = path;
        }
        if let Some(basin) = get("TALLY_S2_BASIN") {
            self.storage.s2.basin = Some(basin);
        }
        if let Some(token) = get("TALLY_S2_ACCESS_TOKEN") {
            self.storage.s2.access_token = Some(token);
        }
        if let Some(url) = get("TALLY_REDIS_URL") {
            self.storage.redis.url = Some(url);
        }
        if let Some(prefix) = get("TALLY_REDIS_KEY_PREFIX") {
            self.storage.redis.key_prefix = Some(prefix);
        }
        if let Some(raw) = get("TALLY_REDIS_MAX_LEN") {
            self.storage.redis.max_len = Some(parse_value("TALLY_REDIS_MAX_LEN", &raw)?);
        }
        if let Some(model) = get("TALLY_DEFAULT_MODEL") {
            self.defaults.model = Some(model);
        }
        if let Some(raw) = get("TALLY_DEFAULT_TEMPERATURE") {
            self.defaults.temperature = Some(parse_value("TALLY_DEFAULT_TEMPERATURE", &raw)?);
        }
        Ok(())
    }

    /// Settings for the selected backend, with required values checked
    pub fn backend_config(&self) -> Result<BackendConfig, ConfigError> {
        let storage = &self.storage;
        match storage.backend {
            BackendKind::Local => Ok(BackendConfig::Local),
            BackendKind::S2 => {
                let basin = non_empty(storage.s2.basin.clone()).ok_or(ConfigError::Missing {
                    backend: BackendKind::S2,
                    key: "storage.s2.basin (TALLY_S2_BASIN)",
                })?;
                let access_token =
                    non_empty(storage.s2.access_token.clone()).ok_or(ConfigError::Missing {
                        backend: BackendKind::S2,
                        key: "storage.s2.access_token (TALLY_S2_ACCESS_TOKEN)",
                    })?;
                Ok(BackendConfig::S2 {
                    basin,
                    access_token,
                    endpoint: non_empty(storage.s2.endpoint.clone()),
                })
            }
            BackendKind::Redis => {
                let url = non_empty(storage.redis.url.clone()).ok_or(ConfigError::Missing {
                    backend: BackendKind::Redis,
                    key: "storage.redis.url (TALLY_REDIS_URL)",
                })?;
                if storage.redis.max_len == Some(0) {
                    return Err(ConfigError::InvalidValue {
                        key: "storage.redis.max_len".into(),
                        message: "must be positive".into(),
                    });
                }
                Ok(BackendConfig::Redis {
                    url,
                    key_prefix: storage.redis.key_prefix.clone().unwrap_or_default(),
                    max_len: storage.redis.max_len,
                })
            }
        }
    }

    /// Base path for the store.
    ///
    /// A relative local path is resolved against the working directory;
    /// keyed backends use the configured path as a logical prefix.
    pub fn base_path(&self) -> String {
        crate::layout::resolve_base(
            self.storage.backend,
            &self.storage.path,
            self.working_dir.as_deref(),
        )
    }
}
