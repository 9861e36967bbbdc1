//! Tracker and field definition endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde_json::{json, Map, Value};

use super::{not_found, ok, PageQuery, SharedState};
use crate::mock_server::state::{reference, ItemFields};

/// GET /trackers/{id}
pub async fn get_tracker(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let state = state.read().await;
    match state.trackers.get(&id) {
        Some(tracker) => ok(tracker.clone()),
        None => not_found("Tracker", id),
    }
}

/// GET /trackers/{id}/items
pub async fn list_tracker_items(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Response {
    let state = state.read().await;
    if !state.trackers.contains_key(&id) {
        return not_found("Tracker", id);
    }
    let refs: Vec<Value> = state
        .items_of(id)
        .into_iter()
        .map(|i| reference(i, "TrackerItemReference"))
        .collect();
    ok(query.envelope(refs, "itemRefs"))
}

/// POST /trackers/{id}/items
///
/// Stores the posted item. Custom field values become the new item's
/// editable fields.
pub async fn create_tracker_item(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut state = state.write().await;
    let Some(tracker) = state.trackers.get(&id) else {
        return not_found("Tracker", id);
    };
    let tracker_ref = reference(tracker, "TrackerReference");

    let item_id = state.next_id();
    let mut item = body;
    item.insert("id".to_string(), json!(item_id));
    item.insert("tracker".to_string(), tracker_ref);
    item.insert("version".to_string(), json!(1));
    let custom_fields = item
        .get("customFields")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let item = Value::Object(item);
    state.items.insert(item_id, item);
    state.item_fields.insert(
        item_id,
        ItemFields {
            editable: custom_fields,
            read_only: Vec::new(),
        },
    );

    match state.item_detail(item_id) {
        Some(item) => ok(item),
        None => not_found("Tracker item", item_id),
    }
}

/// GET /trackers/{id}/fields
pub async fn list_tracker_fields(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let state = state.read().await;
    if !state.trackers.contains_key(&id) {
        return not_found("Tracker", id);
    }
    let refs: Vec<Value> = state
        .fields_of(id)
        .into_iter()
        .map(|f| {
            let mut field = reference(f, "FieldReference");
            field["trackerId"] = json!(id);
            field
        })
        .collect();
    ok(Value::Array(refs))
}

/// GET /trackers/{tracker_id}/fields/{field_id}
pub async fn get_tracker_field(
    State(state): State<SharedState>,
    Path((tracker_id, field_id)): Path<(i64, i64)>,
) -> Response {
    let state = state.read().await;
    match state.fields.get(&(tracker_id, field_id)) {
        Some(field) => ok(field.clone()),
        None => not_found("Field", field_id),
    }
}
