//! Project endpoint handlers.

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{not_found, ok, SharedState};
use crate::mock_server::state::reference;

/// Body of `POST /projects/search`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSearch {
    pub key_name: Option<String>,
}

/// GET /projects
pub async fn list_projects(State(state): State<SharedState>) -> Response {
    let state = state.read().await;
    let projects: Vec<Value> = state
        .projects
        .values()
        .map(|p| reference(p, "ProjectReference"))
        .collect();
    ok(Value::Array(projects))
}

/// GET /projects/{id}
pub async fn get_project(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let state = state.read().await;
    match state.projects.get(&id) {
        Some(project) => ok(project.clone()),
        None => not_found("Project", id),
    }
}

/// POST /projects/search
pub async fn search_projects(
    State(state): State<SharedState>,
    Json(search): Json<ProjectSearch>,
) -> Response {
    let state = state.read().await;
    let projects: Vec<Value> = search
        .key_name
        .as_deref()
        .and_then(|key| state.find_project_by_key(key))
        .into_iter()
        .cloned()
        .collect();
    ok(json!({"page": 1, "pageSize": 25, "total": projects.len(), "projects": projects}))
}

/// GET /projects/{id}/trackers
pub async fn list_project_trackers(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Response {
    let state = state.read().await;
    if !state.projects.contains_key(&id) {
        return not_found("Project", id);
    }
    let trackers: Vec<Value> = state
        .trackers_of(id)
        .into_iter()
        .map(|t| reference(t, "TrackerReference"))
        .collect();
    ok(Value::Array(trackers))
}
