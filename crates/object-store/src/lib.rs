//! Store backends
//!
//! This crate provides the [`Store`](common::prelude::Store) implementations
//! the console can run against:
//!
//! - in-memory (via `object_store::memory::InMemory`), for tests and demos
//! - local filesystem (via `object_store::local::LocalFileSystem`), one
//!   directory per bucket
//! - S3-compatible services such as AWS S3 or MinIO (via `aws-sdk-s3`)
//!
//! # Example
//!
//! ```rust,no_run
//! use bucketeer_object_store::{connect, StoreConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), bucketeer_object_store::BackendError> {
//! let store = connect(&StoreConfig::Local {
//!     root: PathBuf::from("/tmp/buckets"),
//! })
//! .await?;
//! let buckets = store.list_buckets().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use common::prelude::Store;

mod config;
mod error;
mod namespaced;
mod s3;

pub use config::StoreConfig;
pub use error::{BackendError, Result};
pub use namespaced::NamespacedStore;
pub use s3::S3Store;

/// Build the backend described by `config`.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config {
        StoreConfig::Memory => Arc::new(NamespacedStore::memory()),
        StoreConfig::Local { root } => Arc::new(NamespacedStore::local(root).await?),
        StoreConfig::S3 {
            endpoint,
            access_key,
            secret_key,
            region,
            ssl,
        } => Arc::new(
            S3Store::connect(endpoint, access_key, secret_key, region.as_deref(), *ssl).await,
        ),
    };
    tracing::info!(backend = config.kind(), "store connected");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_memory() {
        let store = connect(&StoreConfig::Memory).await.unwrap();
        store.create_bucket("docs").await.unwrap();
        assert_eq!(store.list_buckets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_local_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("buckets");
        let store = connect(&StoreConfig::Local { root: root.clone() })
            .await
            .unwrap();
        assert!(root.is_dir());
        assert!(store.list_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_adapter_over_memory() {
        use std::num::NonZeroUsize;

        use common::prelude::{Console, ObjectMetadata};
        use futures::StreamExt;
        use tokio_util::sync::CancellationToken;

        let store = connect(&StoreConfig::Memory).await.unwrap();
        let console = Console::new(store, NonZeroUsize::new(16).unwrap());
        console.create_bucket("docs").await.unwrap();
        for (prefix, name) in [("a", "b.txt"), ("a/c", "d.txt"), ("/", "e.txt")] {
            let body = futures::stream::once(async { Ok(bytes::Bytes::from_static(b"x")) }).boxed();
            console
                .put_object("docs", prefix, name, body, 1, ObjectMetadata::default())
                .await
                .unwrap();
        }

        let cancel = CancellationToken::new();
        let root = console.list_objects("docs", "/", &cancel).await.unwrap();
        let dirs: Vec<&str> = root.common_prefixes.iter().map(|p| p.prefix()).collect();
        let files: Vec<&str> = root.objects.iter().map(|o| o.key()).collect();
        assert_eq!(dirs, vec!["a/"]);
        assert_eq!(files, vec!["e.txt"]);

        let nested = console.list_objects("docs", "a/", &cancel).await.unwrap();
        let dirs: Vec<&str> = nested.common_prefixes.iter().map(|p| p.prefix()).collect();
        let files: Vec<&str> = nested.objects.iter().map(|o| o.key()).collect();
        assert_eq!(dirs, vec!["a/c/"]);
        assert_eq!(files, vec!["a/b.txt"]);
        assert_eq!(nested.breadcrumbs.len(), 1);
    }
}
