use askama::Template;
use askama_axum::IntoResponse;
use axum::extract::State;
use axum::response::Redirect;
use axum::Form;
use tracing::instrument;

use common::prelude::ROOT;

use super::format_timestamp;
use crate::http_server::error::PageError;
use crate::http_server::params::{objects_href, BucketForm};
use crate::ServiceState;

#[derive(Template)]
#[template(path = "buckets.html")]
pub struct BucketsTemplate {
    pub buckets: Vec<BucketDisplayInfo>,
}

#[derive(Debug, Clone)]
pub struct BucketDisplayInfo {
    pub name: String,
    pub created_at: String,
    pub href: String,
}

#[instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
) -> Result<askama_axum::Response, PageError> {
    let buckets = state.console().list_buckets().await?;

    let buckets = buckets
        .into_iter()
        .map(|b| BucketDisplayInfo {
            href: objects_href(&b.name, ROOT),
            created_at: format_timestamp(b.created_at),
            name: b.name,
        })
        .collect();

    let template = BucketsTemplate { buckets };
    Ok(template.into_response())
}

#[instrument(skip(state))]
pub async fn create(
    State(state): State<ServiceState>,
    Form(form): Form<BucketForm>,
) -> Result<Redirect, PageError> {
    state.console().create_bucket(&form.bucket).await?;
    Ok(Redirect::to(&objects_href(&form.bucket, ROOT)))
}

#[instrument(skip(state))]
pub async fn trash(
    State(state): State<ServiceState>,
    Form(form): Form<BucketForm>,
) -> Result<Redirect, PageError> {
    state.console().delete_bucket(&form.bucket).await?;
    Ok(Redirect::to("/"))
}
