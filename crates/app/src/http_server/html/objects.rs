use askama::Template;
use askama_axum::IntoResponse;
use axum::extract::{Multipart, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_ENCODING, CONTENT_LANGUAGE};
use axum::http::HeaderMap;
use axum::response::Redirect;
use bytes::Bytes;
use futures::StreamExt;
use tracing::instrument;

use common::prelude::{ListingEntry, ObjectMetadata, ROOT};

use super::{format_size, format_timestamp, Crumb};
use crate::http_server::error::PageError;
use crate::http_server::params::{object_href, objects_href, parent_href, ListQuery};
use crate::http_server::scope::RequestScope;
use crate::ServiceState;

#[derive(Template)]
#[template(path = "objects.html")]
pub struct ObjectsTemplate {
    pub bucket_name: String,
    pub prefix: String,
    pub root_href: String,
    pub breadcrumbs: Vec<Crumb>,
    pub dirs: Vec<DirRow>,
    pub files: Vec<FileRow>,
    pub truncated: bool,
    pub max_objects: usize,
}

#[derive(Debug, Clone)]
pub struct DirRow {
    pub name: String,
    pub href: String,
}

#[derive(Debug, Clone)]
pub struct FileRow {
    pub name: String,
    pub href: String,
    pub size: String,
    pub content_type: String,
    pub last_modified: String,
}

#[instrument(skip(state, scope))]
pub async fn handler(
    State(state): State<ServiceState>,
    scope: RequestScope,
    Query(query): Query<ListQuery>,
) -> Result<askama_axum::Response, PageError> {
    let console = state.console();
    let listing = console
        .list_objects(&query.bucket, &query.prefix, scope.token())
        .await?;

    let bucket = &listing.bucket_name;
    let prefix = &listing.query_prefix;

    let dirs = listing
        .common_prefixes
        .into_iter()
        .map(ListingEntry::CommonPrefix)
        .map(|entry| DirRow {
            name: entry.name(prefix).to_string(),
            href: objects_href(bucket, entry.key()),
        })
        .collect();

    let files = listing
        .objects
        .into_iter()
        .map(|object| FileRow {
            href: object_href(bucket, object.key()),
            size: format_size(object.size),
            content_type: object.content_type.clone().unwrap_or_default(),
            last_modified: format_timestamp(object.last_modified),
            name: ListingEntry::Object(object).name(prefix).to_string(),
        })
        .collect();

    let template = ObjectsTemplate {
        root_href: objects_href(bucket, ROOT),
        breadcrumbs: Crumb::trail(bucket, prefix),
        bucket_name: bucket.clone(),
        prefix: prefix.clone(),
        dirs,
        files,
        truncated: listing.truncated,
        max_objects: console.max_entries().get(),
    };
    Ok(template.into_response())
}

/// File part of an upload form. Multipart parts carry no length, so the part
/// is read once to learn the size the store needs.
struct UploadedFile {
    name: String,
    metadata: ObjectMetadata,
    data: Bytes,
}

fn header_value(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Multipart upload with `bucket`, `prefix` and `content` fields.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<ServiceState>,
    mut multipart: Multipart,
) -> Result<Redirect, PageError> {
    let mut bucket = String::new();
    let mut prefix = ROOT.to_string();
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("bucket") => bucket = field.text().await?,
            Some("prefix") => prefix = field.text().await?,
            Some("content") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let headers = field.headers();
                let metadata = ObjectMetadata {
                    content_type: field.content_type().map(str::to_string),
                    content_encoding: header_value(headers, CONTENT_ENCODING),
                    content_disposition: header_value(headers, CONTENT_DISPOSITION),
                    content_language: header_value(headers, CONTENT_LANGUAGE),
                };
                let data = field.bytes().await?;
                file = Some(UploadedFile {
                    name,
                    metadata,
                    data,
                });
            }
            _ => {}
        }
    }

    let Some(file) = file else {
        return Err(PageError::bad_request("missing file content"));
    };

    let size = file.data.len() as u64;
    let data = file.data;
    let body = futures::stream::once(async move { Ok(data) }).boxed();

    let key = state
        .console()
        .put_object(&bucket, &prefix, &file.name, body, size, file.metadata)
        .await?;

    Ok(Redirect::to(&parent_href(&bucket, &key)))
}
