//! Transformation request types.
//!
//! A [`TransformationRequest`] names a dataset, the qastle [`Selection`] to run over it and
//! the transformer settings. Its serialized form is the JSON body of
//! `POST /transformation`.

use std::fmt;

use servicex_query::{ParseError, Query};

/// Default transformer image for xAOD datasets.
pub const DEFAULT_IMAGE: &str = "sslhep/servicex_func_adl_xaod_transformer:v0.4";

/// Default number of events per transformer chunk.
pub const DEFAULT_CHUNK_SIZE: u32 = 1000;

/// Default number of transformer workers.
pub const DEFAULT_WORKERS: u32 = 5;

/// A validated qastle query, sent as the `selection` of a request.
///
/// Text given to [`Selection::parse`] is submitted exactly as written once it parses, so a
/// hand-written query reaches ServiceX byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct Selection(String);

impl Selection {
    /// Validates raw qastle text.
    pub fn parse(text: impl Into<String>) -> Result<Self, SelectionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SelectionError::Empty);
        }
        servicex_query::parse(&text).map_err(SelectionError::Parse)?;
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the selection back into a query tree.
    pub fn to_query(&self) -> Result<Query, ParseError> {
        Query::parse(&self.0)
    }
}

/// Renders a builder query to canonical qastle.
impl From<Query> for Selection {
    fn from(query: Query) -> Self {
        Self(query.to_string())
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("selection is empty")]
    Empty,

    #[error("selection is not valid qastle")]
    Parse(#[source] ParseError),
}

/// Where the transformer publishes its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultDestination {
    /// Files in an object store bucket named after the request
    ObjectStore,
    /// Messages on a Kafka topic; results cannot be fetched by this client
    Kafka,
}

impl fmt::Display for ResultDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultDestination::ObjectStore => f.write_str("object-store"),
            ResultDestination::Kafka => f.write_str("kafka"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultFormat {
    RootFile,
    Parquet,
    Arrow,
}

/// A transformation request, serialized as the body of `POST /transformation`.
///
/// ```
/// use servicex_client::request::{Selection, TransformationRequest};
///
/// let selection = Selection::parse("(call EventDataset (list 'localds:bogus'))").unwrap();
/// let request = TransformationRequest::new("mc15_13TeV:some.dataset", selection).with_workers(2);
/// assert_eq!(request.workers, 2);
/// assert_eq!(request.chunk_size, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransformationRequest {
    /// Dataset identifier, e.g. a Rucio DID
    pub did: String,
    pub selection: Selection,
    /// Transformer container image
    pub image: String,
    pub result_destination: ResultDestination,
    pub result_format: ResultFormat,
    /// Events per transformer chunk
    pub chunk_size: u32,
    pub workers: u32,
}

impl TransformationRequest {
    /// Creates a request with the default transformer settings, writing Parquet files to the
    /// object store.
    pub fn new(did: impl Into<String>, selection: impl Into<Selection>) -> Self {
        Self {
            did: did.into(),
            selection: selection.into(),
            image: DEFAULT_IMAGE.to_string(),
            result_destination: ResultDestination::ObjectStore,
            result_format: ResultFormat::Parquet,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_result_destination(mut self, destination: ResultDestination) -> Self {
        self.result_destination = destination;
        self
    }

    pub fn with_result_format(mut self, format: ResultFormat) -> Self {
        self.result_format = format;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_workers(mut self, workers: u32) -> Self {
        self.workers = workers;
        self
    }

    /// Checks the fields ServiceX would otherwise reject after accepting the request.
    pub fn validate(&self) -> Result<(), InvalidRequestError> {
        if self.did.trim().is_empty() {
            return Err(InvalidRequestError::EmptyDid);
        }
        if self.image.trim().is_empty() {
            return Err(InvalidRequestError::EmptyImage);
        }
        if self.chunk_size == 0 {
            return Err(InvalidRequestError::ZeroChunkSize);
        }
        if self.workers == 0 {
            return Err(InvalidRequestError::ZeroWorkers);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRequestError {
    #[error("dataset identifier is empty")]
    EmptyDid,

    #[error("transformer image is empty")]
    EmptyImage,

    #[error("chunk size must be positive")]
    ZeroChunkSize,

    #[error("worker count must be positive")]
    ZeroWorkers,
}

/// Identifier ServiceX assigns to a submitted request.
///
/// Opaque to the client, but never empty and never containing characters that would change
/// the meaning of the endpoint paths it is placed in (`/`, `?`, `#`, whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidRequestIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidRequestIdError::Empty);
        }
        if let Some(found) = id
            .chars()
            .find(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
        {
            return Err(InvalidRequestIdError::InvalidCharacter { id, found });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = InvalidRequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> serde::Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = String::deserialize(deserializer)?;
        Self::new(id).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRequestIdError {
    #[error("request id is empty")]
    Empty,

    #[error("request id '{id}' contains invalid character {found:?}")]
    InvalidCharacter { id: String, found: char },
}
