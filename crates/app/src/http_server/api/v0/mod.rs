use axum::routing::get;
use axum::Router;

pub mod buckets;
pub mod objects;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/buckets", get(buckets::handler))
        .route("/objects", get(objects::handler))
        .with_state(state)
}
