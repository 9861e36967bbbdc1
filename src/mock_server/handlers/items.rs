//! Tracker item endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{error, not_found, ok, PageQuery, SharedState};
use crate::mock_server::state::{id_of, reference};

/// Body of `PUT /items/{id}/fields`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    #[serde(default)]
    pub field_values: Vec<Value>,
}

/// Body of `POST /items/query`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSearch {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    #[serde(default)]
    pub query_string: String,
}

/// Tracker ids named by a `tracker.id = N` or `tracker.id IN (N, M)`
/// clause. Any other query matches every item.
fn tracker_filter(cbql: &str) -> Option<Vec<i64>> {
    let (_, rest) = cbql.split_once("tracker.id")?;
    let ids = rest
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|digits| digits.parse().ok())
        .collect();
    Some(ids)
}

/// GET /items/{id}
pub async fn get_item(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let state = state.read().await;
    match state.item_detail(id) {
        Some(item) => ok(item),
        None => not_found("Tracker item", id),
    }
}

/// DELETE /items/{id}
pub async fn delete_item(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let mut state = state.write().await;
    match state.items.remove(&id) {
        Some(item) => {
            state.item_fields.remove(&id);
            ok(item)
        }
        None => not_found("Tracker item", id),
    }
}

/// GET /items/{id}/children
pub async fn list_item_children(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Response {
    let state = state.read().await;
    if !state.items.contains_key(&id) {
        return not_found("Tracker item", id);
    }
    let refs: Vec<Value> = state
        .children_of(id)
        .into_iter()
        .map(|child| reference(child, "TrackerItemReference"))
        .collect();
    ok(query.envelope(refs, "itemRefs"))
}

/// GET /items/{id}/fields
pub async fn get_item_fields(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let state = state.read().await;
    if !state.items.contains_key(&id) {
        return not_found("Tracker item", id);
    }
    let fields = state.item_fields.get(&id).cloned().unwrap_or_default();
    ok(json!({
        "itemId": id,
        "editableFields": fields.editable,
        "readOnlyFields": fields.read_only,
        "editableTableFields": [],
        "readOnlyTableFields": []
    }))
}

/// PUT /items/{id}/fields
pub async fn update_item_fields(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(update): Json<FieldUpdate>,
) -> Response {
    let mut state = state.write().await;
    if !state.items.contains_key(&id) {
        return not_found("Tracker item", id);
    }
    if let Err(field) = state.update_item_fields(id, &update.field_values) {
        return error(
            StatusCode::BAD_REQUEST,
            format!("Field '{field}' is not editable"),
        );
    }
    match state.item_detail(id) {
        Some(item) => ok(item),
        None => not_found("Tracker item", id),
    }
}

/// POST /items/query
pub async fn query_items(State(state): State<SharedState>, Json(search): Json<ItemSearch>) -> Response {
    let state = state.read().await;
    let trackers = tracker_filter(&search.query_string);
    let items: Vec<Value> = state
        .items
        .values()
        .filter(|item| match &trackers {
            Some(ids) => item
                .get("tracker")
                .map(id_of)
                .is_some_and(|tracker| ids.contains(&tracker)),
            None => true,
        })
        .filter_map(|item| state.item_detail(id_of(item)))
        .collect();

    let page = PageQuery {
        page: search.page,
        page_size: search.page_size,
    };
    ok(page.envelope(items, "items"))
}

/// GET /items/{item_id}/fields/{field_id}/options
pub async fn list_choice_options(
    State(state): State<SharedState>,
    Path((item_id, field_id)): Path<(i64, i64)>,
    Query(query): Query<PageQuery>,
) -> Response {
    let state = state.read().await;
    match state.choice_options.get(&(item_id, field_id)) {
        Some(options) => ok(query.envelope(options.clone(), "references")),
        None => not_found("Field", field_id),
    }
}
