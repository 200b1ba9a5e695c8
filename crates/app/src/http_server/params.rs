//! Query strings and forms shared by the HTML pages and the JSON API,
//! plus the links that point back at them.

use serde::Deserialize;
use url::form_urlencoded;

use common::path::{compute_parent, ROOT, SEPARATOR};

fn root() -> String {
    ROOT.to_string()
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "root")]
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectQuery {
    #[serde(default)]
    pub bucket: String,
    #[serde(default, rename = "objectID")]
    pub object_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BucketForm {
    #[serde(default)]
    pub bucket: String,
}

/// Listing page of `prefix` in `bucket`.
pub fn objects_href(bucket: &str, prefix: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("bucket", bucket)
        .append_pair("prefix", prefix)
        .finish();
    format!("/objects?{}", query)
}

/// Info page of one object.
pub fn object_href(bucket: &str, key: &str) -> String {
    format!("/object?{}", object_query(bucket, key))
}

/// Raw content of one object.
pub fn raw_href(bucket: &str, key: &str) -> String {
    format!("/object/raw?{}", object_query(bucket, key))
}

fn object_query(bucket: &str, key: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("bucket", bucket)
        .append_pair("objectID", key)
        .finish()
}

/// A parent path from [`compute_parent`] turned into a listing prefix.
pub fn dir_prefix(parent: &str) -> String {
    if parent.ends_with(SEPARATOR) {
        parent.to_string()
    } else {
        format!("{}{}", parent, SEPARATOR)
    }
}

/// Listing page of the directory holding `key`.
pub fn parent_href(bucket: &str, key: &str) -> String {
    objects_href(bucket, &dir_prefix(&compute_parent(key)))
}
