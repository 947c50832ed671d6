//! Reading transformation results from the object store.
//!
//! ServiceX writes the output files of a request into a bucket named after the request
//! identifier. [`ResultFetcher::fetch`] locates that bucket, downloads every object in key
//! order and decodes them as Parquet into a single [`ResultTable`].

use std::sync::Arc;

use arrow::{datatypes::SchemaRef, error::ArrowError, record_batch::RecordBatch};
use bytes::Bytes;
use monitoring::logging;
use object_store::ObjectStore;
use parquet::{arrow::arrow_reader::ParquetRecordBatchReaderBuilder, errors::ParquetError};
use servicex_object_store::{
    ObjectStoreCreationError, StoreCredentials, bucket_store,
    ext::{ObjectStoreExt as _, ObjectStoreExtError},
    url::ObjectStoreUrl,
};

use crate::{
    request::{RequestId, ResultDestination},
    table::ResultTable,
    transformation::{GetError, TransformationsClient},
};

/// Every Parquet file starts and ends with these bytes.
const PARQUET_MAGIC: &[u8; 4] = b"PAR1";

/// Where the results of a request are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLocation {
    pub request_id: RequestId,
    /// Bucket holding the result files, named after the request
    pub bucket: String,
    /// Object keys in the bucket, sorted
    pub keys: Vec<String>,
}

/// Downloads and decodes transformation results.
#[derive(Debug, Clone)]
pub struct ResultFetcher {
    store_url: ObjectStoreUrl,
    credentials: StoreCredentials,
}

impl ResultFetcher {
    pub fn new(store_url: ObjectStoreUrl, credentials: StoreCredentials) -> Self {
        Self {
            store_url,
            credentials,
        }
    }

    /// Fetches the full result table of a finished request.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Location`] when the request or its results cannot be found
    /// - [`FetchError::Download`] when an object cannot be listed or read
    /// - [`FetchError::Parse`] when an object is not valid Parquet or the files disagree on
    ///   their schema
    #[tracing::instrument(skip(self, transformations, id), fields(request_id = %id))]
    pub async fn fetch(
        &self,
        transformations: &TransformationsClient<'_>,
        id: &RequestId,
    ) -> Result<ResultTable, FetchError> {
        let (store, location) = self.locate(transformations, id).await?;

        let mut schema: Option<SchemaRef> = None;
        let mut batches = Vec::new();
        for key in &location.keys {
            let bytes = store.get_bytes(key.as_str()).await.map_err(|err| {
                tracing::error!(key = %key, error = %err, error_source = logging::error_source(&err), "Failed to download result object");
                FetchError::Download {
                    key: key.clone(),
                    source: err,
                }
            })?;

            let (file_schema, file_batches) =
                decode_parquet(bytes).map_err(|err| FetchError::Parse {
                    key: key.clone(),
                    source: err,
                })?;

            match &schema {
                Some(expected) if expected.fields() != file_schema.fields() => {
                    return Err(FetchError::Parse {
                        key: key.clone(),
                        source: ParseError::SchemaMismatch {
                            expected: expected.clone(),
                            found: file_schema,
                        },
                    });
                }
                Some(_) => {}
                None => schema = Some(file_schema),
            }

            tracing::debug!(key = %key, batches = file_batches.len(), "Decoded result object");
            batches.extend(file_batches);
        }

        // `locate` guarantees at least one key, so a schema has been seen
        let schema = schema.ok_or_else(|| {
            FetchError::Location(LocationError::EmptyBucket {
                bucket: location.bucket.clone(),
            })
        })?;
        let table = ResultTable::new(schema, batches);
        tracing::info!(
            files = location.keys.len(),
            rows = table.num_rows(),
            "Fetched transformation results"
        );
        Ok(table)
    }

    /// Finds the bucket of a request and lists its objects.
    #[tracing::instrument(skip(self, transformations, id), fields(request_id = %id))]
    pub async fn location(
        &self,
        transformations: &TransformationsClient<'_>,
        id: &RequestId,
    ) -> Result<ResultLocation, FetchError> {
        self.locate(transformations, id)
            .await
            .map(|(_, location)| location)
    }

    async fn locate(
        &self,
        transformations: &TransformationsClient<'_>,
        id: &RequestId,
    ) -> Result<(Arc<dyn ObjectStore>, ResultLocation), FetchError> {
        let detail = transformations
            .get(id)
            .await
            .map_err(|err| FetchError::Location(LocationError::Lookup(err)))?
            .ok_or_else(|| {
                FetchError::Location(LocationError::RequestNotFound {
                    request_id: id.clone(),
                })
            })?;

        if detail.result_destination != ResultDestination::ObjectStore {
            return Err(FetchError::Location(LocationError::UnsupportedDestination {
                destination: detail.result_destination,
            }));
        }

        let bucket = id.as_str().to_string();
        let store =
            bucket_store(&self.store_url, &bucket, &self.credentials).map_err(|err| match err {
                ObjectStoreCreationError::BucketNotFound { .. } => {
                    FetchError::Location(LocationError::BucketNotFound {
                        bucket: bucket.clone(),
                    })
                }
                err => FetchError::Location(LocationError::Store(err)),
            })?;

        let objects = store.list_sorted().await.map_err(|err| {
            if err.is_not_found() {
                tracing::warn!(bucket = %bucket, "Result bucket does not exist");
                return FetchError::Location(LocationError::BucketNotFound {
                    bucket: bucket.clone(),
                });
            }
            tracing::error!(bucket = %bucket, error = %err, error_source = logging::error_source(&err), "Failed to list result bucket");
            FetchError::Download {
                key: bucket.clone(),
                source: err,
            }
        })?;
        if objects.is_empty() {
            return Err(FetchError::Location(LocationError::EmptyBucket { bucket }));
        }

        let keys = objects
            .into_iter()
            .map(|object| object.location.to_string())
            .collect();
        Ok((
            store,
            ResultLocation {
                request_id: id.clone(),
                bucket,
                keys,
            },
        ))
    }
}

fn decode_parquet(bytes: Bytes) -> Result<(SchemaRef, Vec<RecordBatch>), ParseError> {
    if bytes.len() < 2 * PARQUET_MAGIC.len()
        || !bytes.starts_with(PARQUET_MAGIC)
        || !bytes.ends_with(PARQUET_MAGIC)
    {
        return Err(ParseError::NotParquet { len: bytes.len() });
    }

    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes).map_err(ParseError::Parquet)?;
    let schema = builder.schema().clone();
    let reader = builder.build().map_err(ParseError::Parquet)?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(ParseError::Arrow)?;
    Ok((schema, batches))
}

/// Errors that can occur when fetching results.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The results of the request could not be located
    #[error("failed to locate transformation results")]
    Location(#[source] LocationError),

    /// An object could not be listed or downloaded
    ///
    /// `key` is the object key, or the bucket name when listing failed.
    #[error("failed to download result object '{key}'")]
    Download {
        key: String,
        #[source]
        source: ObjectStoreExtError,
    },

    /// An object is not a readable Parquet file
    #[error("failed to parse result object '{key}'")]
    Parse {
        key: String,
        #[source]
        source: ParseError,
    },
}

impl FetchError {
    /// Whether the error is an object or bucket that does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            FetchError::Download { source, .. } => source.is_not_found(),
            FetchError::Location(
                LocationError::RequestNotFound { .. } | LocationError::BucketNotFound { .. },
            ) => true,
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    /// ServiceX has no request with this identifier
    #[error("transformation {request_id} not found")]
    RequestNotFound { request_id: RequestId },

    #[error("results are published to '{destination}', not the object store")]
    UnsupportedDestination { destination: ResultDestination },

    /// The request's result bucket does not exist in the store
    #[error("result bucket '{bucket}' does not exist")]
    BucketNotFound { bucket: String },

    #[error("bucket '{bucket}' holds no result files")]
    EmptyBucket { bucket: String },

    /// Looking up the request failed
    #[error("failed to look up transformation")]
    Lookup(#[source] GetError),

    #[error("failed to open result store")]
    Store(#[source] ObjectStoreCreationError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The object lacks the Parquet magic bytes
    #[error("not a parquet file ({len} bytes)")]
    NotParquet { len: usize },

    #[error("invalid parquet file")]
    Parquet(#[source] ParquetError),

    #[error("failed to decode record batch")]
    Arrow(#[source] ArrowError),

    /// The file's schema differs from the first file of the request
    #[error("schema differs from the first result file")]
    SchemaMismatch {
        expected: SchemaRef,
        found: SchemaRef,
    },
}
