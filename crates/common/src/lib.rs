/**
 * Pure string functions over object keys.
 *  - parent directory of a key
 *  - breadcrumb trail of a prefix
 */
pub mod path;
/**
 * The contract we need from an object store,
 *  and the raw types it hands back to us.
 */
pub mod store;
/**
 * Turns a flat, delimiter-based listing into
 *  a bounded directory view.
 */
pub mod listing;
/**
 * Validated pass-through operations on top of a store,
 *  plus the listing adapter.
 */
pub mod console;
pub mod error;
/**
 * Scripted store double for exercising the adapter
 *  without a real backend.
 */
pub mod testkit;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::console::{upload_key, Console};
    pub use crate::error::ConsoleError;
    pub use crate::listing::{
        CommonPrefix, ListingAdapter, ListingEntry, ListingResult, ObjectEntry,
    };
    pub use crate::path::{compute_breadcrumbs, compute_parent, BreadcrumbSegment, ROOT};
    pub use crate::store::{
        BucketInfo, ByteStream, ListObjectsRequest, ObjectInfo, ObjectMetadata, ObjectStream,
        Store, StoreEntry, StoreError,
    };
    pub use crate::version::BuildInfo;
    pub use tokio_util::sync::CancellationToken;
}
