//! Extension trait for ObjectStore.

use std::future::Future;

use bytes::Bytes;
use futures::TryStreamExt as _;
use object_store::{ObjectMeta, ObjectStore, path::Path};

/// Extension trait for `ObjectStore` that provides convenient methods for common operations.
pub trait ObjectStoreExt {
    /// Reads the entire contents of an object as `Bytes`.
    ///
    /// This is a convenience method that combines `ObjectStore::get()` and reading
    /// all bytes from the returned stream.
    fn get_bytes(
        &self,
        location: impl Into<Path>,
    ) -> impl Future<Output = Result<Bytes, ObjectStoreExtError>>;

    /// Lists every object in the store, sorted by location.
    ///
    /// Object stores make no ordering promise for listings; sorting gives callers a stable
    /// order to concatenate results in.
    fn list_sorted(&self) -> impl Future<Output = Result<Vec<ObjectMeta>, ObjectStoreExtError>>;
}

impl<T> ObjectStoreExt for T
where
    T: ObjectStore,
{
    async fn get_bytes(&self, location: impl Into<Path>) -> Result<Bytes, ObjectStoreExtError> {
        self.get(&location.into())
            .await
            .map_err(ObjectStoreExtError::ObjectStoreGet)?
            .bytes()
            .await
            .map_err(ObjectStoreExtError::ObjectStoreBytes)
    }

    async fn list_sorted(&self) -> Result<Vec<ObjectMeta>, ObjectStoreExtError> {
        let mut objects: Vec<ObjectMeta> = self
            .list(None)
            .try_collect()
            .await
            .map_err(ObjectStoreExtError::ObjectStoreList)?;
        objects.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(objects)
    }
}

/// Error type for object store read operations.
///
/// Used by [`ObjectStoreExt`] methods.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreExtError {
    /// Error getting object metadata or initiating object retrieval.
    ///
    /// This error occurs when calling `.get()` on the object store.
    /// Common causes: network timeouts, permission denied, file not found,
    /// service unavailable, or authentication failure.
    #[error("failed to get object: {0}")]
    ObjectStoreGet(#[source] object_store::Error),

    /// Error reading object bytes after successful retrieval.
    ///
    /// This error occurs when calling `.bytes()` on a retrieved object.
    /// Common causes: network interruption during download or timeout while
    /// streaming the object content.
    #[error("failed to read object bytes: {0}")]
    ObjectStoreBytes(#[source] object_store::Error),

    /// Error listing the objects of the store.
    ///
    /// Common causes: the bucket does not exist, the store is unreachable,
    /// or the credentials lack list permission.
    #[error("failed to list objects: {0}")]
    ObjectStoreList(#[source] object_store::Error),
}

impl ObjectStoreExtError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ObjectStoreExtError::ObjectStoreGet(object_store::Error::NotFound { .. })
                | ObjectStoreExtError::ObjectStoreBytes(object_store::Error::NotFound { .. })
                | ObjectStoreExtError::ObjectStoreList(object_store::Error::NotFound { .. })
        )
    }
}
