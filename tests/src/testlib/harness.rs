//! The services a test runs against.

use std::path::PathBuf;

use servicex_client::{
    BuildError, Client,
    poll::PollPolicy,
    request::{Selection, TransformationRequest},
    results::ResultFetcher,
};
use servicex_config::{Config, ConfigError, TransformationDefaults};

/// Environment variable naming the TOML configuration file for live tests.
pub const TEST_CONFIG_ENV_VAR: &str = "SERVICEX_TEST_CONFIG";

/// A ServiceX client, a result fetcher for its object store and the policy for waiting on
/// transformations.
#[derive(Debug, Clone)]
pub struct Harness {
    client: Client,
    fetcher: ResultFetcher,
    poll_policy: PollPolicy,
    defaults: TransformationDefaults,
}

impl Harness {
    pub fn new(
        client: Client,
        fetcher: ResultFetcher,
        poll_policy: PollPolicy,
        defaults: TransformationDefaults,
    ) -> Self {
        Self {
            client,
            fetcher,
            poll_policy,
            defaults,
        }
    }

    /// Creates a harness for the deployment described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, HarnessSetupError> {
        let client = Client::new(config.servicex_url.clone()).map_err(HarnessSetupError::Client)?;
        let fetcher = ResultFetcher::new(
            config.object_store.url.clone(),
            config.object_store.credentials.clone(),
        );
        let poll_policy = PollPolicy {
            interval: config.poll.interval,
            max_interval: config.poll.max_interval,
            factor: config.poll.backoff_factor,
            timeout: config.poll.timeout,
        };

        Ok(Self::new(
            client,
            fetcher,
            poll_policy,
            config.transformation.clone(),
        ))
    }

    /// Creates a harness for the live deployment.
    ///
    /// Reads the file named by `SERVICEX_TEST_CONFIG` when set; `SERVICEX_CONFIG_*` variables
    /// override it either way.
    pub fn live() -> Result<Self, HarnessSetupError> {
        let config_path = std::env::var_os(TEST_CONFIG_ENV_VAR).map(PathBuf::from);
        let config = Config::load(config_path.as_deref()).map_err(HarnessSetupError::Config)?;
        tracing::info!(servicex_url = %config.servicex_url, object_store = %config.object_store.url, "Using live ServiceX deployment");
        Self::from_config(&config)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn fetcher(&self) -> &ResultFetcher {
        &self.fetcher
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    /// A request for `did` carrying the configured transformer settings.
    pub fn request(
        &self,
        did: impl Into<String>,
        selection: impl Into<Selection>,
    ) -> TransformationRequest {
        TransformationRequest::new(did, selection)
            .with_image(self.defaults.image.clone())
            .with_chunk_size(self.defaults.chunk_size)
            .with_workers(self.defaults.workers)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HarnessSetupError {
    #[error("failed to load harness configuration")]
    Config(#[source] ConfigError),

    #[error("failed to create ServiceX client")]
    Client(#[source] BuildError),
}
