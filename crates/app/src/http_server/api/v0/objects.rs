use axum::extract::{Json, Query, State};
use axum::response::{IntoResponse, Response};

use crate::http_server::error::ApiError;
use crate::http_server::params::ListQuery;
use crate::http_server::scope::RequestScope;
use crate::ServiceState;

/// One level of a bucket as JSON, in the same shape the listing adapter
/// produces it.
#[tracing::instrument(skip(state, scope))]
pub async fn handler(
    State(state): State<ServiceState>,
    scope: RequestScope,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let listing = state
        .console()
        .list_objects(&query.bucket, &query.prefix, scope.token())
        .await?;
    Ok((http::StatusCode::OK, Json(listing)).into_response())
}
