//! Association endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::{json, Map, Value};

use super::{error, not_found, ok, SharedState};

/// POST /associations
pub async fn create_association(
    State(state): State<SharedState>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut state = state.write().await;

    for end in ["from", "to"] {
        let id = body.get(end).and_then(|r| r.get("id")).and_then(Value::as_i64);
        match id {
            Some(id) if state.items.contains_key(&id) => {}
            Some(id) => return not_found("Tracker item", id),
            None => return error(StatusCode::BAD_REQUEST, format!("'{end}' is required")),
        }
    }

    let id = state.next_id();
    let mut association = body;
    association.insert("id".to_string(), json!(id));
    let association = Value::Object(association);
    state.associations.insert(id, association.clone());
    ok(association)
}

/// DELETE /associations/{id}
pub async fn delete_association(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let mut state = state.write().await;
    match state.associations.remove(&id) {
        Some(association) => ok(association),
        None => not_found("Association", id),
    }
}
