//! User endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{not_found, ok, PageQuery, SharedState};

/// `?name=` of `GET /users/findByName`.
#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

/// `?email=` of `GET /users/findByEmail`.
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// GET /users
pub async fn list_users(State(state): State<SharedState>, Query(query): Query<PageQuery>) -> Response {
    let state = state.read().await;
    let refs: Vec<Value> = state
        .users
        .values()
        .map(|u| {
            json!({
                "id": u["id"],
                "name": u["name"],
                "email": u["email"],
                "type": "UserReference"
            })
        })
        .collect();
    ok(query.envelope(refs, "users"))
}

/// GET /users/{id}
pub async fn get_user(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    let state = state.read().await;
    match state.users.get(&id) {
        Some(user) => ok(user.clone()),
        None => not_found("User", id),
    }
}

/// GET /users/findByName
pub async fn find_user_by_name(
    State(state): State<SharedState>,
    Query(query): Query<NameQuery>,
) -> Response {
    let state = state.read().await;
    match state.find_user_by_name(&query.name) {
        Some(user) => ok(user.clone()),
        None => not_found("User", &query.name),
    }
}

/// GET /users/findByEmail
pub async fn find_user_by_email(
    State(state): State<SharedState>,
    Query(query): Query<EmailQuery>,
) -> Response {
    let state = state.read().await;
    match state.find_user_by_email(&query.email) {
        Some(user) => ok(user.clone()),
        None => not_found("User", &query.email),
    }
}
