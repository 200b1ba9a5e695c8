use std::fmt::Debug;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use http::request::Parts;

use common::prelude::Console;

use crate::ServiceState;

/// A dependency the readiness probe has to hear back from.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("object store isn't reachable: {0}")]
    StoreUnreachable(String),
}

/// The store answers a bucket listing.
#[async_trait]
impl DataSource for Console {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        self.list_buckets()
            .await
            .map(|_| ())
            .map_err(|e| DataSourceError::StoreUnreachable(e.to_string()))
    }
}

/// Readiness dependencies of the running service.
#[derive(Clone)]
pub struct StateDataSource(Arc<dyn DataSource>);

impl StateDataSource {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self(source)
    }

    pub async fn is_ready(&self) -> Result<(), DataSourceError> {
        self.0.is_ready().await
    }
}

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for StateDataSource
where
    ServiceState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let console = ServiceState::from_ref(state).console().clone();
        Ok(Self::new(Arc::new(console)))
    }
}
