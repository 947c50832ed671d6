//! TOML configuration file loading with environment variable overrides.
//!
//! Deserializes a [`ConfigFile`] using [Figment], merging `SERVICEX_CONFIG_*` environment
//! variables over an optional TOML file. The raw [`ConfigFile`] is later validated into a
//! [`Config`](crate::Config) by [`Config::load`](crate::Config::load).
//!
//! ## Priority chain
//!
//! | Priority | Source |
//! |----------|--------|
//! | 1 (highest) | `SERVICEX_CONFIG_*` env vars |
//! | 2 | TOML file values |
//! | 3 (lowest) | Serde defaults (a local ServiceX with MinIO port-forwarded on 9000) |
//!
//! ## Environment variables
//!
//! All env vars are prefixed with `SERVICEX_CONFIG_` and use double underscores to separate
//! nested keys. For example, `SERVICEX_CONFIG_POLL__TIMEOUT_SECS` maps to `poll.timeout_secs`.

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format as _, Toml},
};
use fs_err as fs;

use crate::secret_key::SecretKey;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "SERVICEX_CONFIG_";

/// Default ServiceX REST endpoint (port-forwarded app service)
pub const DEFAULT_SERVICEX_URL: &str = "http://localhost:5000/servicex";

/// Default object store endpoint (port-forwarded MinIO)
pub const DEFAULT_OBJECT_STORE_URL: &str = "http://localhost:9000";

/// Default transformer image for xAOD datasets
pub const DEFAULT_TRANSFORMER_IMAGE: &str = "sslhep/servicex_func_adl_xaod_transformer:v0.4";

/// Load a [`ConfigFile`] from an optional TOML file with env-var overrides.
///
/// A `config_path` that is given but cannot be read is an error; with `None` only defaults
/// and environment variables are used.
pub fn load(config_path: Option<&Path>) -> Result<ConfigFile, LoadConfigFileError> {
    let mut figment = Figment::new();

    if let Some(path) = config_path {
        let contents = fs::read_to_string(path).map_err(LoadConfigFileError::Io)?;
        figment = figment.merge(Toml::string(&contents));
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|err| LoadConfigFileError::Figment(Box::new(err)))
}

/// Raw configuration as deserialized from the TOML config file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConfigFile {
    /// ServiceX REST API base URL (default: `http://localhost:5000/servicex`)
    #[serde(default = "default_servicex_url")]
    pub servicex_url: String,

    #[serde(default)]
    pub object_store: ObjectStoreSection,

    #[serde(default)]
    pub transformation: TransformationSection,

    #[serde(default)]
    pub poll: PollSection,
}

/// `[object_store]` table: where ServiceX writes results.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ObjectStoreSection {
    /// MinIO endpoint, `s3://` URL, or local directory (default: `http://localhost:9000`)
    #[serde(default = "default_object_store_url")]
    pub url: String,
    /// Access key (default: `miniouser`)
    #[serde(default = "default_access_key")]
    pub access_key: String,
    /// Secret key (default: `leftfoot1`)
    #[serde(default = "default_secret_key")]
    pub secret_key: SecretKey,
    /// Region sent with signed requests; MinIO ignores it (default: `us-east-1`)
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for ObjectStoreSection {
    fn default() -> Self {
        Self {
            url: default_object_store_url(),
            access_key: default_access_key(),
            secret_key: default_secret_key(),
            region: default_region(),
        }
    }
}

/// `[transformation]` table: defaults for submitted requests.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TransformationSection {
    /// Transformer container image
    #[serde(default = "default_image")]
    pub image: String,
    /// Events per transformer chunk (default: 1000)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    /// Transformer worker count (default: 5)
    #[serde(default = "default_workers")]
    pub workers: u32,
}

impl Default for TransformationSection {
    fn default() -> Self {
        Self {
            image: default_image(),
            chunk_size: default_chunk_size(),
            workers: default_workers(),
        }
    }
}

/// `[poll]` table: completion polling policy.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PollSection {
    /// First delay between status checks in seconds (default: 1.0)
    #[serde(default)]
    pub interval_secs: ConfigDuration<1>,
    /// Upper bound for the backed-off delay in seconds (default: 10.0)
    #[serde(default)]
    pub max_interval_secs: ConfigDuration<10>,
    /// Multiplier applied to the delay after each check (default: 1.5)
    #[serde(default)]
    pub backoff_factor: Option<f32>,
    /// Give up waiting after this many seconds (default: 1800.0)
    #[serde(default)]
    pub timeout_secs: ConfigDuration<1800>,
}

/// A duration given in (fractional) seconds, defaulting to `DEFAULT_SECS`.
#[derive(Debug, Clone, Copy)]
pub struct ConfigDuration<const DEFAULT_SECS: u64>(Duration);

impl<const DEFAULT_SECS: u64> Default for ConfigDuration<DEFAULT_SECS> {
    fn default() -> Self {
        Self(Duration::from_secs(DEFAULT_SECS))
    }
}

impl<const DEFAULT_SECS: u64> From<ConfigDuration<DEFAULT_SECS>> for Duration {
    fn from(val: ConfigDuration<DEFAULT_SECS>) -> Self {
        val.0
    }
}

impl<'de, const DEFAULT_SECS: u64> serde::Deserialize<'de> for ConfigDuration<DEFAULT_SECS> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;

        let Some(secs) = <Option<f64> as serde::Deserialize>::deserialize(deserializer)? else {
            return Ok(Self::default());
        };
        Duration::try_from_secs_f64(secs)
            .map(Self)
            .map_err(|err| D::Error::custom(format!("invalid duration {secs}: {err}")))
    }
}

fn default_servicex_url() -> String {
    DEFAULT_SERVICEX_URL.into()
}

fn default_object_store_url() -> String {
    DEFAULT_OBJECT_STORE_URL.into()
}

fn default_access_key() -> String {
    "miniouser".into()
}

fn default_secret_key() -> SecretKey {
    SecretKey::from("leftfoot1")
}

fn default_region() -> String {
    "us-east-1".into()
}

fn default_image() -> String {
    DEFAULT_TRANSFORMER_IMAGE.into()
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_workers() -> u32 {
    5
}

/// Error when loading configuration from a TOML file.
#[derive(Debug, thiserror::Error)]
pub enum LoadConfigFileError {
    /// The configuration file could not be read
    #[error("failed to read configuration file")]
    Io(#[source] std::io::Error),

    /// A source could not be parsed or a value has the wrong type
    #[error("failed to parse configuration")]
    Figment(#[source] Box<figment::Error>),
}
