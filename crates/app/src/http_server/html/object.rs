use askama::Template;
use askama_axum::IntoResponse;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{Redirect, Response};
use axum::Form;
use tracing::instrument;

use common::path::compute_parent;

use super::{format_size, format_timestamp, Crumb};
use crate::http_server::error::PageError;
use crate::http_server::params::{dir_prefix, objects_href, parent_href, raw_href, ObjectQuery};
use crate::ServiceState;

#[derive(Template)]
#[template(path = "object.html")]
pub struct ObjectTemplate {
    pub bucket_name: String,
    pub object_id: String,
    pub root_href: String,
    pub parent: String,
    pub parent_href: String,
    pub breadcrumbs: Vec<Crumb>,
    pub raw_href: String,
    pub size: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub last_modified: String,
    pub etag: String,
}

#[instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Query(query): Query<ObjectQuery>,
) -> Result<askama_axum::Response, PageError> {
    let info = state
        .console()
        .stat_object(&query.bucket, &query.object_id)
        .await?;

    let bucket = query.bucket;
    let parent = compute_parent(&info.key);

    let template = ObjectTemplate {
        root_href: objects_href(&bucket, common::path::ROOT),
        parent_href: objects_href(&bucket, &dir_prefix(&parent)),
        breadcrumbs: Crumb::trail(&bucket, &parent),
        raw_href: raw_href(&bucket, &info.key),
        size: format_size(info.size),
        size_bytes: info.size,
        last_modified: format_timestamp(info.last_modified),
        etag: info.etag.unwrap_or_default(),
        content_type: info.content_type,
        object_id: info.key,
        bucket_name: bucket,
        parent,
    };
    Ok(template.into_response())
}

/// Streams object content; nothing is buffered.
#[instrument(skip(state))]
pub async fn raw(
    State(state): State<ServiceState>,
    Query(query): Query<ObjectQuery>,
) -> Result<Response, PageError> {
    let object = state
        .console()
        .get_object(&query.bucket, &query.object_id)
        .await?;

    let headers = [
        (CONTENT_TYPE, object.info.content_type),
        (CONTENT_LENGTH, object.info.size.to_string()),
    ];
    Ok((headers, Body::from_stream(object.body)).into_response())
}

#[instrument(skip(state))]
pub async fn trash(
    State(state): State<ServiceState>,
    Form(form): Form<ObjectQuery>,
) -> Result<Redirect, PageError> {
    state
        .console()
        .delete_object(&form.bucket, &form.object_id)
        .await?;
    Ok(Redirect::to(&parent_href(&form.bucket, &form.object_id)))
}
