//! Object store access for transformation results.
//!
//! ServiceX writes the output of every transformation request into a bucket named after the
//! request identifier. This crate validates the configured store location and creates stores
//! scoped to a single bucket, so the result fetcher deals only in object keys.

use std::sync::Arc;

use object_store::{ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem};

pub mod ext;
pub mod url;

use self::url::{ObjectStoreProvider, ObjectStoreUrl};

/// Access credentials for S3-compatible stores.
///
/// Ignored by the local filesystem provider.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// Creates an object store whose root is the given bucket.
///
/// - **S3-compatible** (`http://`, `https://`): path-style requests against the endpoint, as
///   MinIO expects. Plain HTTP is allowed only for `http://` endpoints.
/// - **Amazon S3** (`s3://`): configured from `AWS_*` environment variables, with
///   `credentials` taking precedence.
/// - **Local** (`file://`): the bucket is the `<root>/<bucket>` directory, which must exist.
pub fn bucket_store(
    url: impl AsRef<ObjectStoreUrl>,
    bucket: &str,
    credentials: &StoreCredentials,
) -> Result<Arc<dyn ObjectStore>, ObjectStoreCreationError> {
    let url = url.as_ref();
    let creation_error = |source| ObjectStoreCreationError::Backend {
        url: url.to_string(),
        bucket: bucket.to_string(),
        source,
    };

    tracing::debug!(%url, bucket, provider = ?url.provider(), "Creating bucket store");
    match url.provider() {
        ObjectStoreProvider::S3Compatible => {
            let endpoint = url.endpoint().unwrap_or_else(|| url.to_string());
            let store = AmazonS3Builder::new()
                .with_endpoint(endpoint)
                .with_allow_http(url.scheme().eq_ignore_ascii_case("http"))
                .with_virtual_hosted_style_request(false)
                .with_bucket_name(bucket)
                .with_region(&credentials.region)
                .with_access_key_id(&credentials.access_key_id)
                .with_secret_access_key(&credentials.secret_access_key)
                .build()
                .map_err(creation_error)?;
            Ok(Arc::new(store))
        }
        ObjectStoreProvider::AmazonS3 => {
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .with_region(&credentials.region)
                .with_access_key_id(&credentials.access_key_id)
                .with_secret_access_key(&credentials.secret_access_key)
                .build()
                .map_err(creation_error)?;
            Ok(Arc::new(store))
        }
        ObjectStoreProvider::Local => {
            let root = url.to_file_path().map_err(|()| {
                creation_error(object_store::Error::Generic {
                    store: "LocalFileSystem",
                    source: "object store URL is not a valid filesystem path".into(),
                })
            })?;
            let bucket_dir = root.join(bucket);
            if !bucket_dir.is_dir() {
                return Err(ObjectStoreCreationError::BucketNotFound {
                    url: url.to_string(),
                    bucket: bucket.to_string(),
                });
            }
            let store = LocalFileSystem::new_with_prefix(bucket_dir).map_err(creation_error)?;
            Ok(Arc::new(store))
        }
    }
}

/// Failed to create object store instance.
///
/// The URL itself has been validated before this point.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreCreationError {
    /// The local filesystem provider found no `<root>/<bucket>` directory
    #[error("bucket '{bucket}' does not exist at {url}")]
    BucketNotFound { url: String, bucket: String },

    /// The object store backend failed to instantiate, e.g. a malformed endpoint or region
    #[error("failed to create object store for bucket '{bucket}' at {url}")]
    Backend {
        url: String,
        bucket: String,
        #[source]
        source: object_store::Error,
    },
}
