//! Listing adapter: a bounded, cancellable directory view over a flat store.
//!
//! A listing is opened against the store with the `/` delimiter, so every
//! item the store returns is either a common prefix (a "virtual directory")
//! or a concrete object. Which one is decided by the key alone: keys ending
//! in `/` are directories, everything else is a file.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{target, ConsoleError};
use crate::path::{self, compute_breadcrumbs, BreadcrumbSegment, ROOT, SEPARATOR};
use crate::store::{ListObjectsRequest, Store, StoreEntry, DELIMITER};

const OP_LIST: &str = "list_objects";

/// A virtual directory: every key sharing this prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonPrefix {
    prefix: String,
}

impl CommonPrefix {
    /// Returns `None` unless `prefix` ends with the separator.
    pub fn new(prefix: impl Into<String>) -> Option<Self> {
        let prefix = prefix.into();
        prefix.ends_with(SEPARATOR).then_some(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// A concrete object with metadata copied from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

impl ObjectEntry {
    /// Returns `None` if `key` ends with the separator.
    pub fn new(key: impl Into<String>, size: u64) -> Option<Self> {
        let key = key.into();
        (!key.ends_with(SEPARATOR)).then_some(Self {
            key,
            size,
            last_modified: None,
            content_type: None,
            etag: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingEntry {
    CommonPrefix(CommonPrefix),
    Object(ObjectEntry),
}

impl ListingEntry {
    pub fn key(&self) -> &str {
        match self {
            ListingEntry::CommonPrefix(p) => p.prefix(),
            ListingEntry::Object(o) => o.key(),
        }
    }

    /// Last component of the key relative to `query_prefix`.
    pub fn name<'a>(&'a self, query_prefix: &str) -> &'a str {
        path::display_name(self.key(), query_prefix)
    }
}

impl From<StoreEntry> for ListingEntry {
    /// Classifies by trailing separator only; the store's own flag is not
    /// consulted.
    fn from(entry: StoreEntry) -> Self {
        if entry.key.ends_with(SEPARATOR) {
            ListingEntry::CommonPrefix(CommonPrefix { prefix: entry.key })
        } else {
            ListingEntry::Object(ObjectEntry {
                key: entry.key,
                size: entry.size.unwrap_or(0),
                last_modified: entry.last_modified,
                content_type: entry.content_type,
                etag: entry.etag,
            })
        }
    }
}

/// Directory view of one prefix of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingResult {
    pub bucket_name: String,
    pub query_prefix: String,
    pub common_prefixes: Vec<CommonPrefix>,
    pub objects: Vec<ObjectEntry>,
    pub breadcrumbs: Vec<BreadcrumbSegment>,
    /// The listing stopped at the configured maximum; more entries may exist
    pub truncated: bool,
}

impl ListingResult {
    pub fn len(&self) -> usize {
        self.common_prefixes.len() + self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct ListingAdapter {
    store: Arc<dyn Store>,
    max_entries: NonZeroUsize,
}

impl ListingAdapter {
    pub fn new(store: Arc<dyn Store>, max_entries: NonZeroUsize) -> Self {
        Self { store, max_entries }
    }

    pub fn max_entries(&self) -> NonZeroUsize {
        self.max_entries
    }

    /// List one level of `bucket` below `prefix`.
    ///
    /// Consumption stops after `max_entries` entries, or as soon as `cancel`
    /// fires; in both cases the store stream is dropped without being drained.
    pub async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<ListingResult, ConsoleError> {
        if bucket.is_empty() {
            return Err(ConsoleError::invalid("bucket name is required"));
        }

        let query_prefix = if prefix.is_empty() { ROOT } else { prefix };
        let target = target(bucket, query_prefix);
        let max = self.max_entries.get();

        let request = ListObjectsRequest {
            bucket: bucket.to_string(),
            prefix: path::store_prefix(query_prefix).to_string(),
            delimiter: DELIMITER.to_string(),
            max_keys: max,
        };

        let mut entries = self.store.list_objects(request);
        let mut common_prefixes = Vec::new();
        let mut objects = Vec::new();
        let mut truncated = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(%target, "listing cancelled by caller");
                    return Err(ConsoleError::Cancelled { op: OP_LIST, target });
                }
                next = entries.next() => next,
            };

            let Some(entry) = next else {
                break;
            };
            let entry = entry.map_err(|e| ConsoleError::unavailable(OP_LIST, target.clone(), e))?;

            match ListingEntry::from(entry) {
                ListingEntry::CommonPrefix(p) => common_prefixes.push(p),
                ListingEntry::Object(o) => objects.push(o),
            }

            if common_prefixes.len() + objects.len() >= max {
                truncated = true;
                break;
            }
        }
        drop(entries);

        tracing::debug!(
            %target,
            directories = common_prefixes.len(),
            files = objects.len(),
            truncated,
            "listing complete"
        );

        Ok(ListingResult {
            bucket_name: bucket.to_string(),
            query_prefix: query_prefix.to_string(),
            common_prefixes,
            objects,
            breadcrumbs: compute_breadcrumbs(query_prefix),
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ScriptedStore;

    fn adapter(store: &Arc<ScriptedStore>, max: usize) -> ListingAdapter {
        ListingAdapter::new(store.clone(), NonZeroUsize::new(max).unwrap())
    }

    fn prefixes(result: &ListingResult) -> Vec<&str> {
        result.common_prefixes.iter().map(|p| p.prefix()).collect()
    }

    fn keys(result: &ListingResult) -> Vec<&str> {
        result.objects.iter().map(|o| o.key()).collect()
    }

    async fn docs_store() -> Arc<ScriptedStore> {
        let store = Arc::new(ScriptedStore::new());
        store.insert_bucket("docs");
        store.insert_object("docs", "a/b.txt", b"b");
        store.insert_object("docs", "a/c/d.txt", b"d");
        store.insert_object("docs", "e.txt", b"e");
        store
    }

    #[test]
    fn test_constructors_enforce_separator_rule() {
        assert!(CommonPrefix::new("a/").is_some());
        assert!(CommonPrefix::new("a").is_none());
        assert!(ObjectEntry::new("a.txt", 1).is_some());
        assert!(ObjectEntry::new("a/", 0).is_none());
    }

    #[test]
    fn test_classification_ignores_store_flag() {
        let mut entry = StoreEntry::object("dir/", 0);
        entry.is_common_prefix = false;
        assert!(matches!(
            ListingEntry::from(entry),
            ListingEntry::CommonPrefix(_)
        ));

        let entry = StoreEntry::common_prefix("file.txt");
        assert!(matches!(ListingEntry::from(entry), ListingEntry::Object(_)));
    }

    #[tokio::test]
    async fn test_list_root() {
        let store = docs_store().await;
        let result = adapter(&store, 16)
            .list("docs", "/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.bucket_name, "docs");
        assert_eq!(result.query_prefix, "/");
        assert_eq!(prefixes(&result), vec!["a/"]);
        assert_eq!(keys(&result), vec!["e.txt"]);
        assert!(result.breadcrumbs.is_empty());
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_list_nested_prefix() {
        let store = docs_store().await;
        let result = adapter(&store, 16)
            .list("docs", "a/", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(prefixes(&result), vec!["a/c/"]);
        assert_eq!(keys(&result), vec!["a/b.txt"]);
        assert_eq!(
            result.breadcrumbs,
            vec![BreadcrumbSegment {
                display_name: "a/".to_string(),
                cumulative_prefix: "a".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_prefix_means_root() {
        let store = docs_store().await;
        let result = adapter(&store, 16)
            .list("docs", "", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.query_prefix, "/");
        assert_eq!(prefixes(&result), vec!["a/"]);
    }

    #[tokio::test]
    async fn test_empty_bucket_is_not_an_error() {
        let store = Arc::new(ScriptedStore::new());
        store.insert_bucket("empty");
        let result = adapter(&store, 16)
            .list("empty", "", &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.common_prefixes.is_empty());
        assert!(result.objects.is_empty());
        assert!(result.breadcrumbs.is_empty());
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_bounded() {
        let store = Arc::new(ScriptedStore::new());
        store.insert_bucket("big");
        for i in 0..50 {
            store.insert_object("big", &format!("file-{:02}.txt", i), b"x");
            store.insert_object("big", &format!("dir-{:02}/x.txt", i), b"x");
        }

        for max in [1, 3, 7, 64, 100, 200] {
            let result = adapter(&store, max)
                .list("big", "/", &CancellationToken::new())
                .await
                .unwrap();
            assert!(result.len() <= max, "max {}", max);
            assert_eq!(result.len(), max.min(100));
            assert_eq!(result.truncated, max <= 100);
        }
    }

    #[tokio::test]
    async fn test_truncation_stops_reading() {
        let store = Arc::new(ScriptedStore::new());
        store.insert_bucket("big");
        for i in 0..20 {
            store.insert_object("big", &format!("k{:02}", i), b"x");
        }

        adapter(&store, 5)
            .list("big", "/", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(store.list_reads(), 5);
    }

    #[tokio::test]
    async fn test_store_order_is_preserved() {
        let store = Arc::new(ScriptedStore::new());
        store.script_listing(vec![
            StoreEntry::object("z.txt", 1),
            StoreEntry::common_prefix("m/"),
            StoreEntry::object("a.txt", 1),
            StoreEntry::common_prefix("b/"),
        ]);

        let result = adapter(&store, 10)
            .list("any", "/", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(prefixes(&result), vec!["m/", "b/"]);
        assert_eq!(keys(&result), vec!["z.txt", "a.txt"]);
    }

    #[tokio::test]
    async fn test_every_entry_classified_by_trailing_separator() {
        let store = Arc::new(ScriptedStore::new());
        let scripted: Vec<StoreEntry> = (0..40)
            .map(|i| {
                if i % 3 == 0 {
                    StoreEntry::common_prefix(format!("d{}/", i))
                } else {
                    StoreEntry::object(format!("f{}", i), i)
                }
            })
            .collect();
        store.script_listing(scripted);

        let result = adapter(&store, 100)
            .list("any", "/", &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.common_prefixes.iter().all(|p| p.prefix().ends_with('/')));
        assert!(result.objects.iter().all(|o| !o.key().ends_with('/')));
        assert_eq!(result.len(), 40);
    }

    #[tokio::test]
    async fn test_object_metadata_is_copied_verbatim() {
        let store = Arc::new(ScriptedStore::new());
        let modified = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        store.script_listing(vec![StoreEntry {
            key: "report.pdf".to_string(),
            is_common_prefix: false,
            size: Some(4096),
            last_modified: Some(modified),
            content_type: Some("application/pdf".to_string()),
            etag: Some("\"abc\"".to_string()),
        }]);

        let result = adapter(&store, 10)
            .list("any", "/", &CancellationToken::new())
            .await
            .unwrap();
        let object = &result.objects[0];
        assert_eq!(object.size, 4096);
        assert_eq!(object.last_modified, Some(modified));
        assert_eq!(object.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(object.etag.as_deref(), Some("\"abc\""));
    }

    #[tokio::test]
    async fn test_empty_bucket_name_fails_before_store_call() {
        let store = docs_store().await;
        let err = adapter(&store, 10)
            .list("", "/", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidArgument(_)));
        assert_eq!(store.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_bucket_is_unavailable() {
        let store = Arc::new(ScriptedStore::new());
        let err = adapter(&store, 10)
            .list("nope", "/", &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            ConsoleError::StoreUnavailable { op, target, .. } => {
                assert_eq!(op, "list_objects");
                assert_eq!(target, "nope/");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backend_failure_is_unavailable() {
        let store = docs_store().await;
        store.fail_with("connection reset");
        let err = adapter(&store, 10)
            .list("docs", "a/", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::StoreUnavailable { .. }));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_reads_nothing() {
        let store = docs_store().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = adapter(&store, 10).list("docs", "/", &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(store.list_reads(), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_enumeration_stops_reads() {
        let store = Arc::new(ScriptedStore::new());
        store.insert_bucket("big");
        for i in 0..100 {
            store.insert_object("big", &format!("k{:03}", i), b"x");
        }

        let cancel = CancellationToken::new();
        store.cancel_after(3, cancel.clone());

        let err = adapter(&store, 1000)
            .list("big", "/", &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(store.list_reads(), 3);

        // nothing keeps reading in the background
        tokio::task::yield_now().await;
        assert_eq!(store.list_reads(), 3);
    }
}
