//! HTTP request handlers for the mock server.

pub mod associations;
pub mod items;
pub mod projects;
pub mod trackers;
pub mod users;

pub use associations::*;
pub use items::*;
pub use projects::*;
pub use trackers::*;
pub use users::*;

use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::mock_server::state::MockState;

/// Shared state as handlers receive it.
pub type SharedState = Arc<RwLock<MockState>>;

/// Pagination query parameters (`?page=&pageSize=`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    /// Cut one page out of `items` and wrap it in a listing envelope under `key`.
    pub fn envelope(&self, items: Vec<Value>, key: &str) -> Value {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size.unwrap_or(25).max(1);
        let total = items.len();

        let start = ((page - 1) as usize).saturating_mul(page_size as usize);
        let slice: Vec<Value> = items
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        let mut envelope = json!({"page": page, "pageSize": page_size, "total": total});
        envelope[key] = Value::Array(slice);
        envelope
    }
}

/// A codeBeamer-style error body with the given status.
pub fn error(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(json!({
            "exception": "com.intland.codebeamer.api.v3.exception.ApiException",
            "message": message
        })),
    )
        .into_response()
}

/// 404 for a missing entity.
pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Response {
    error(StatusCode::NOT_FOUND, format!("{entity} is not found with id: {id}"))
}

/// 200 with a JSON body.
pub fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}
