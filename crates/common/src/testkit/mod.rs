//! In-process store double for adapter and console tests
//!
//! [`ScriptedStore`] behaves like a small object store (buckets, keys,
//! delimiter grouping) and records how it was driven, so tests can assert
//! on store traffic as well as on results.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//! use common::prelude::*;
//! use common::testkit::ScriptedStore;
//!
//! #[tokio::test]
//! async fn test_listing() {
//!     let store = Arc::new(ScriptedStore::new());
//!     store.insert_bucket("docs");
//!     store.insert_object("docs", "a/b.txt", b"hello");
//!
//!     let adapter = ListingAdapter::new(store.clone(), NonZeroUsize::new(10).unwrap());
//!     let result = adapter.list("docs", "/", &CancellationToken::new()).await.unwrap();
//!     assert_eq!(result.common_prefixes[0].prefix(), "a/");
//! }
//! ```

mod store;

pub use store::ScriptedStore;
