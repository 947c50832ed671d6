//! ServiceX REST API client.
//!
//! Submits transformation requests, follows them to completion and reads their results back
//! from the object store ServiceX writes to.
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use servicex_client::{
//!     Client,
//!     poll::{PollPolicy, Poller},
//!     request::{Selection, TransformationRequest},
//! };
//!
//! let client = Client::new("http://localhost:5000/servicex".parse()?)?;
//! let selection = Selection::parse("(call ResultParquet (call EventDataset (list 'localds:bogus')) (list 'JetPt') 'junk.parquet')")?;
//! let request = TransformationRequest::new("mc15_13TeV:some.dataset", selection);
//!
//! let request_id = client.transformations().submit(&request).await?;
//! let outcome = Poller::new(PollPolicy::default())
//!     .wait(&client.transformations(), &request_id)
//!     .await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use url::Url;

pub mod error;
pub mod poll;
pub mod request;
pub mod results;
pub mod status;
pub mod table;
pub mod transformation;

use self::transformation::TransformationsClient;

/// Time allowed for a single HTTP request, from connecting to reading the whole body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a ServiceX deployment.
///
/// The base URL is the `/servicex` prefix of the deployment, for example
/// `http://localhost:5000/servicex`. All endpoint paths are joined onto it.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Creates a client whose requests time out after [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new(base_url: Url) -> Result<Self, BuildError> {
        Self::with_request_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client whose requests fail with a network error after `timeout`.
    pub fn with_request_timeout(base_url: Url, timeout: Duration) -> Result<Self, BuildError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("servicex-harness/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(BuildError::HttpClient)?;
        Self::with_http_client(http, base_url)
    }

    /// Creates a client that sends requests through `http`.
    ///
    /// A missing trailing slash is added to the base URL path, so relative joins keep the
    /// `/servicex` prefix.
    pub fn with_http_client(http: reqwest::Client, mut base_url: Url) -> Result<Self, BuildError> {
        if base_url.cannot_be_a_base() {
            return Err(BuildError::CannotBeABase {
                url: base_url.to_string(),
            });
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { http, base_url })
    }

    /// Get the base URL every endpoint path is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Get a client for the `/transformation` endpoints.
    pub fn transformations(&self) -> TransformationsClient<'_> {
        TransformationsClient::new(self)
    }
}

/// Errors that can occur when creating a [`Client`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The base URL cannot have paths joined onto it (e.g. `mailto:` or `data:` URLs)
    #[error("base URL cannot be a base: {url}")]
    CannotBeABase { url: String },

    /// The HTTP client could not be initialized
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}
