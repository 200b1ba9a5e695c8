//! Validated pass-through operations over a [`Store`].
//!
//! Everything here checks argument shape before touching the store, then maps
//! backend errors into [`ConsoleError`]. Listing goes through the
//! [`ListingAdapter`].

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{target, ConsoleError};
use crate::listing::{ListingAdapter, ListingResult};
use crate::path::SEPARATOR;
use crate::store::{
    exact_size, BucketInfo, ByteStream, ObjectInfo, ObjectMetadata, ObjectStream, Store,
};

/// Key an upload lands under: `prefix` forced to end with the separator,
/// joined with `file_name`, leading separators removed.
///
/// ```
/// use common::prelude::upload_key;
///
/// assert_eq!(upload_key("/", "a.txt"), "a.txt");
/// assert_eq!(upload_key("photos", "cat.png"), "photos/cat.png");
/// assert_eq!(upload_key("/photos/", "cat.png"), "photos/cat.png");
/// ```
pub fn upload_key(prefix: &str, file_name: &str) -> String {
    let mut key = prefix.to_string();
    if !key.ends_with(SEPARATOR) {
        key.push(SEPARATOR);
    }
    key.push_str(file_name);
    key.trim_start_matches(SEPARATOR).to_string()
}

fn require(value: &str, what: &str) -> Result<(), ConsoleError> {
    if value.is_empty() {
        return Err(ConsoleError::invalid(format!("{} is required", what)));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Console {
    store: Arc<dyn Store>,
    listing: ListingAdapter,
}

impl Console {
    pub fn new(store: Arc<dyn Store>, max_entries: NonZeroUsize) -> Self {
        let listing = ListingAdapter::new(store.clone(), max_entries);
        Self { store, listing }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn max_entries(&self) -> NonZeroUsize {
        self.listing.max_entries()
    }

    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>, ConsoleError> {
        self.store
            .list_buckets()
            .await
            .map_err(|e| ConsoleError::unavailable("list_buckets", "*", e))
    }

    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<ListingResult, ConsoleError> {
        self.listing.list(bucket, prefix, cancel).await
    }

    pub async fn create_bucket(&self, name: &str) -> Result<(), ConsoleError> {
        require(name, "bucket name")?;
        self.store
            .create_bucket(name)
            .await
            .map_err(|e| ConsoleError::unavailable("create_bucket", name, e))?;
        tracing::info!(bucket = name, "bucket created");
        Ok(())
    }

    pub async fn delete_bucket(&self, name: &str) -> Result<(), ConsoleError> {
        require(name, "bucket name")?;
        self.store
            .delete_bucket(name)
            .await
            .map_err(|e| ConsoleError::from_store("delete_bucket", name, e))?;
        tracing::info!(bucket = name, "bucket deleted");
        Ok(())
    }

    pub async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo, ConsoleError> {
        require(bucket, "bucket name")?;
        require(key, "object key")?;
        self.store
            .stat_object(bucket, key)
            .await
            .map_err(|e| ConsoleError::from_store("stat_object", target(bucket, key), e))
    }

    /// Open an object for reading. The body is released when the returned
    /// stream is dropped.
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, ConsoleError> {
        require(bucket, "bucket name")?;
        require(key, "object key")?;
        self.store
            .get_object(bucket, key)
            .await
            .map_err(|e| ConsoleError::from_store("get_object", target(bucket, key), e))
    }

    /// Upload `size` bytes under [`upload_key`]`(prefix, file_name)` and
    /// return the key written. The body is streamed to the store; a body
    /// that does not hold exactly `size` bytes is an invalid argument.
    pub async fn put_object(
        &self,
        bucket: &str,
        prefix: &str,
        file_name: &str,
        body: ByteStream,
        size: u64,
        metadata: ObjectMetadata,
    ) -> Result<String, ConsoleError> {
        require(bucket, "bucket name")?;
        require(file_name, "file name")?;

        let key = upload_key(prefix, file_name);
        let target = target(bucket, &key);

        self.store
            .put_object(bucket, &key, exact_size(body, size), size, metadata)
            .await
            .map_err(|e| ConsoleError::from_store("put_object", target.clone(), e))?;

        tracing::info!(%target, size, "object uploaded");
        Ok(key)
    }

    /// Delete an object. Deleting a key that does not exist succeeds.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ConsoleError> {
        require(bucket, "bucket name")?;
        require(key, "object key")?;
        match self.store.delete_object(bucket, key).await {
            Ok(()) => {
                tracing::info!(bucket, key, "object deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(bucket, key, "delete of missing object ignored");
                Ok(())
            }
            Err(e) => Err(ConsoleError::unavailable(
                "delete_object",
                target(bucket, key),
                e,
            )),
        }
    }
}
