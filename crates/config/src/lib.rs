//! Harness configuration.
//!
//! Where the ServiceX instance and its result store live, what transformer settings submitted
//! requests carry by default, and how long to wait for a transformation to finish.

use std::{path::Path, time::Duration};

use servicex_object_store::{
    StoreCredentials,
    url::{ObjectStoreUrl, ObjectStoreUrlError},
};
use url::Url;

pub mod config_file;
pub mod secret_key;

pub use self::{
    config_file::{ConfigDuration, ConfigFile, ENV_PREFIX, LoadConfigFileError},
    secret_key::SecretKey,
};

/// Default backoff multiplier between status checks
pub const DEFAULT_BACKOFF_FACTOR: f32 = 1.5;

/// Validated harness configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// ServiceX REST API base URL
    pub servicex_url: Url,
    pub object_store: ObjectStoreConfig,
    pub transformation: TransformationDefaults,
    pub poll: PollConfig,
}

#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub url: ObjectStoreUrl,
    pub credentials: StoreCredentials,
}

/// Values every submitted request carries unless the test overrides them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationDefaults {
    pub image: String,
    pub chunk_size: u32,
    pub workers: u32,
}

/// Completion polling policy.
///
/// The delay starts at `interval`, grows by `backoff_factor` after every check, and never
/// exceeds `max_interval`. Waiting stops once `timeout` has elapsed since the first check.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f32,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            timeout: Duration::from_secs(1800),
        }
    }
}

impl Config {
    /// Loads the configuration from an optional TOML file, with `SERVICEX_CONFIG_*`
    /// environment variables taking precedence.
    ///
    /// Nested values use double underscore separators, e.g. `SERVICEX_CONFIG_OBJECT_STORE__URL`
    /// overrides `object_store.url`.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = config_file::load(config_path).map_err(ConfigError::Load)?;
        let config = Self::try_from(config_file)?;

        tracing::debug!(?config, "configuration loaded");

        Ok(config)
    }
}

impl TryFrom<ConfigFile> for Config {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let servicex_url =
            Url::parse(&file.servicex_url).map_err(|err| ConfigError::InvalidServiceUrl {
                url: file.servicex_url.clone(),
                source: err,
            })?;
        if !matches!(servicex_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "servicex_url",
                reason: format!("unsupported scheme '{}'", servicex_url.scheme()),
            });
        }

        let store_url = ObjectStoreUrl::new(file.object_store.url.clone()).map_err(|err| {
            ConfigError::InvalidObjectStoreUrl {
                url: file.object_store.url.clone(),
                source: err,
            }
        })?;

        let transformation = TransformationDefaults {
            image: file.transformation.image,
            chunk_size: file.transformation.chunk_size,
            workers: file.transformation.workers,
        };
        if transformation.image.trim().is_empty() {
            return Err(invalid("transformation.image", "must not be empty"));
        }
        if transformation.chunk_size == 0 {
            return Err(invalid("transformation.chunk_size", "must be positive"));
        }
        if transformation.workers == 0 {
            return Err(invalid("transformation.workers", "must be positive"));
        }

        let poll = PollConfig {
            interval: file.poll.interval_secs.into(),
            max_interval: file.poll.max_interval_secs.into(),
            backoff_factor: file.poll.backoff_factor.unwrap_or(DEFAULT_BACKOFF_FACTOR),
            timeout: file.poll.timeout_secs.into(),
        };
        if poll.interval.is_zero() {
            return Err(invalid("poll.interval_secs", "must be positive"));
        }
        if poll.max_interval < poll.interval {
            return Err(invalid(
                "poll.max_interval_secs",
                "must not be shorter than poll.interval_secs",
            ));
        }
        if !(poll.backoff_factor >= 1.0 && poll.backoff_factor.is_finite()) {
            return Err(invalid("poll.backoff_factor", "must be a finite number >= 1"));
        }
        if poll.timeout.is_zero() {
            return Err(invalid("poll.timeout_secs", "must be positive"));
        }

        Ok(Self {
            servicex_url,
            object_store: ObjectStoreConfig {
                url: store_url,
                credentials: StoreCredentials {
                    access_key_id: file.object_store.access_key,
                    secret_access_key: file.object_store.secret_key.into_inner(),
                    region: file.object_store.region,
                },
            },
            transformation,
            poll,
        })
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[source] LoadConfigFileError),

    #[error("invalid ServiceX URL '{url}'")]
    InvalidServiceUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid object store URL '{url}'")]
    InvalidObjectStoreUrl {
        url: String,
        #[source]
        source: ObjectStoreUrlError,
    },

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
