//! Validated URL wrapper and provider types for object store URLs.

use std::path::PathBuf;

use fs_err as fs;
use url::Url;

/// A validated URL wrapper that ensures the URL is a valid object store URL.
///
/// The URL addresses the object store *service*, not a bucket: ServiceX writes every request's
/// output to its own bucket, so the bucket is chosen per request when the store is created
/// (see [`crate::bucket_store`]).
#[derive(Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectStoreUrl(Url);

impl ObjectStoreUrl {
    /// Creates a new ObjectStoreUrl from a string that can be either a URL or filesystem path.
    pub fn new(location: impl Into<String>) -> Result<Self, ObjectStoreUrlError> {
        let location = location.into();

        // If the location fails to parse as a URL, we assume it's a filesystem path.
        Self::try_from_url(&location).or_else(|_| Self::try_from_filesystem_path(&location))
    }

    /// Parses a string as a URL and validates it for object store use.
    ///
    /// The URL must have a supported object store scheme (`file://`, `http://`, `s3://`, etc.).
    fn try_from_url(url: impl AsRef<str>) -> Result<Self, ObjectStoreUrlError> {
        let inner = Url::parse(url.as_ref()).map_err(ObjectStoreUrlError::UrlParseError)?;
        inner.try_into()
    }

    /// Parses a string as a filesystem path and converts it to a `file://` URL.
    ///
    /// The path must exist and must be canonicalized to an absolute path.
    fn try_from_filesystem_path(location: impl AsRef<str>) -> Result<Self, ObjectStoreUrlError> {
        let path = PathBuf::from(location.as_ref());

        let canonical_path = fs::canonicalize(&path)
            .map_err(|err| ObjectStoreUrlError::InvalidFilesystemPath { path, source: err })?;

        let url = Url::from_directory_path(&canonical_path).map_err(|_| {
            ObjectStoreUrlError::InvalidFilesystemPath {
                path: canonical_path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "absolute path could not be resolved",
                ),
            }
        })?;

        Ok(Self(url))
    }

    /// Consumes self and returns the inner [`Url`].
    pub fn into_url(self) -> Url {
        self.0
    }

    /// Returns the [`ObjectStoreProvider`] of the URL.
    pub fn provider(&self) -> ObjectStoreProvider {
        match self.0.scheme() {
            s if ObjectStoreProvider::is_local_filesystem(s) => ObjectStoreProvider::Local,
            s if ObjectStoreProvider::is_amazon_s3(s) => ObjectStoreProvider::AmazonS3,
            s if ObjectStoreProvider::is_s3_compatible(s) => ObjectStoreProvider::S3Compatible,
            _ => unreachable!(), // We validate the scheme previously.
        }
    }

    /// Returns the endpoint of an S3-compatible store, without a trailing slash.
    ///
    /// `None` for every other provider.
    pub fn endpoint(&self) -> Option<String> {
        match self.provider() {
            ObjectStoreProvider::S3Compatible => {
                Some(self.0.as_str().trim_end_matches('/').to_string())
            }
            ObjectStoreProvider::Local | ObjectStoreProvider::AmazonS3 => None,
        }
    }
}

impl AsRef<ObjectStoreUrl> for ObjectStoreUrl {
    fn as_ref(&self) -> &ObjectStoreUrl {
        self
    }
}

impl std::ops::Deref for ObjectStoreUrl {
    type Target = Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Url> for ObjectStoreUrl {
    type Error = ObjectStoreUrlError;

    fn try_from(value: Url) -> Result<Self, Self::Error> {
        // Validate the scheme to ensure it's a supported object store scheme
        let _: ObjectStoreProvider = value.scheme().parse()?;
        Ok(Self(value))
    }
}

impl std::str::FromStr for ObjectStoreUrl {
    type Err = ObjectStoreUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s)
            .map_err(ObjectStoreUrlError::UrlParseError)?
            .try_into()
    }
}

impl std::fmt::Display for ObjectStoreUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Debug for ObjectStoreUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Supported object store providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectStoreProvider {
    /// Local filesystem (`file://`), buckets are sub-directories of the root
    Local,

    /// Amazon S3 (`s3://`, `s3a://`), endpoint and region come from `AWS_*` variables
    AmazonS3,

    /// S3-compatible service such as MinIO, addressed by its endpoint (`http://`, `https://`)
    S3Compatible,
}

impl ObjectStoreProvider {
    /// Returns `true` if the scheme is one of:
    /// - `s3://`
    /// - `s3a://`
    #[inline]
    fn is_amazon_s3(s: impl AsRef<str>) -> bool {
        let scheme = s.as_ref();
        scheme.eq_ignore_ascii_case("s3") || scheme.eq_ignore_ascii_case("s3a")
    }

    /// Returns `true` if the scheme is `http://` or `https://`.
    #[inline]
    fn is_s3_compatible(s: impl AsRef<str>) -> bool {
        let scheme = s.as_ref();
        scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
    }

    /// Returns `true` if the scheme is `file://`.
    #[inline]
    fn is_local_filesystem(s: impl AsRef<str>) -> bool {
        s.as_ref().eq_ignore_ascii_case("file")
    }
}

impl std::str::FromStr for ObjectStoreProvider {
    type Err = ObjectStoreUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if ObjectStoreProvider::is_local_filesystem(s) => Ok(ObjectStoreProvider::Local),
            s if ObjectStoreProvider::is_amazon_s3(s) => Ok(ObjectStoreProvider::AmazonS3),
            s if ObjectStoreProvider::is_s3_compatible(s) => {
                Ok(ObjectStoreProvider::S3Compatible)
            }
            _ => Err(ObjectStoreUrlError::UnsupportedScheme {
                scheme: s.to_string(),
            }),
        }
    }
}

/// Error type for invalid object store URLs.
///
/// Valid object store schemes are: `file`, `s3`, `s3a`, `http` and `https`.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreUrlError {
    /// URL string has invalid syntax and cannot be parsed
    #[error(transparent)]
    UrlParseError(url::ParseError),

    /// URL scheme is not supported by object stores
    ///
    /// Supported schemes:
    /// - `file://` - Local filesystem
    /// - `s3://` or `s3a://` - Amazon S3
    /// - `http://` or `https://` - S3-compatible endpoint (MinIO)
    #[error("unsupported object store scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// Filesystem path does not exist or cannot be accessed
    ///
    /// The path must be created (e.g., via `std::fs::create_dir_all()`) before attempting
    /// to create an object store URL from it.
    #[error("invalid filesystem path: {path}")]
    InvalidFilesystemPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
