use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};

mod buckets;
mod object;
mod objects;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", get(buckets::handler))
        .route("/buckets", post(buckets::create))
        .route("/buckets/trash", post(buckets::trash))
        .route("/objects", get(objects::handler).post(objects::upload))
        .route("/object", get(object::handler))
        .route("/object/raw", get(object::raw))
        .route("/object/trash", post(object::trash))
        .with_state(state)
}

/// One breadcrumb as rendered: the segment name and the listing it opens.
#[derive(Debug, Clone)]
pub struct Crumb {
    pub name: String,
    pub href: String,
}

impl Crumb {
    fn trail(bucket: &str, prefix: &str) -> Vec<Crumb> {
        common::path::compute_breadcrumbs(prefix)
            .into_iter()
            .map(|segment| Crumb {
                href: super::params::objects_href(
                    bucket,
                    &super::params::dir_prefix(&segment.cumulative_prefix),
                ),
                name: segment.display_name,
            })
            .collect()
    }
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Human readable size, powers of 1024.
fn format_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", size, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
