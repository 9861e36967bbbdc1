//! Mock codeBeamer API server.
//!
//! Provides an axum-based HTTP server that simulates the codeBeamer REST
//! API (v3) under `/cb/api/v3`, the default API root of [`RestClient`].
//!
//! [`RestClient`]: crate::RestClient

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::{DefaultScenario, Fixtures};
use super::handlers;
use super::state::MockState;

const API_ROOT: &str = "/cb/api/v3";

/// A mock codeBeamer server for testing.
///
/// The server runs in the background and can be used to test the client
/// against a realistic, stateful API implementation.
pub struct MockServer {
    /// The URL where the server is listening.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the server's base URL.
    pub async fn start() -> Self {
        Self::with_state(Self::default_state()).await
    }

    /// Start a mock server with empty state.
    ///
    /// Useful when you want to control exactly what data is available.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Server error");
        });

        Self {
            url: format!("http://{}", addr),
            handle,
            state: shared_state,
        }
    }

    /// Get the server URL (without the API root).
    ///
    /// Use this URL when creating a `RestClient` or `Codebeamer` for testing.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get access to the server's shared state.
    ///
    /// This allows modifying the mock data during a test.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task. It's safe to call multiple times.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Create the default state with common test fixtures.
    fn default_state() -> MockState {
        Self::state_from_scenario(Fixtures::default_scenario())
    }

    /// Create state from a scenario.
    fn state_from_scenario(scenario: DefaultScenario) -> MockState {
        let mut state = MockState::new();

        for user in scenario.users {
            state = state.with_user(user);
        }
        for project in scenario.projects {
            state = state.with_project(project);
        }
        for tracker in scenario.trackers {
            state = state.with_tracker(tracker);
        }
        for (tracker_id, field) in scenario.fields {
            state = state.with_field(tracker_id, field);
        }
        for item in scenario.items {
            state = state.with_item(item);
        }
        for (item_id, fields) in scenario.item_fields {
            state.item_fields.insert(item_id, fields);
        }
        for ((item_id, field_id), options) in scenario.choice_options {
            state = state.with_choice_options(item_id, field_id, options);
        }

        state
    }

    /// Create the axum router with all routes.
    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        let api = Router::new()
            // Project routes
            .route("/projects", get(handlers::list_projects))
            .route("/projects/search", post(handlers::search_projects))
            .route("/projects/:id", get(handlers::get_project))
            .route("/projects/:id/trackers", get(handlers::list_project_trackers))
            // Tracker routes
            .route("/trackers/:id", get(handlers::get_tracker))
            .route(
                "/trackers/:id/items",
                get(handlers::list_tracker_items).post(handlers::create_tracker_item),
            )
            .route("/trackers/:id/fields", get(handlers::list_tracker_fields))
            .route(
                "/trackers/:tracker_id/fields/:field_id",
                get(handlers::get_tracker_field),
            )
            // Item routes
            .route("/items/query", post(handlers::query_items))
            .route(
                "/items/:id",
                get(handlers::get_item).delete(handlers::delete_item),
            )
            .route("/items/:id/children", get(handlers::list_item_children))
            .route(
                "/items/:id/fields",
                get(handlers::get_item_fields).put(handlers::update_item_fields),
            )
            .route(
                "/items/:item_id/fields/:field_id/options",
                get(handlers::list_choice_options),
            )
            // User routes
            .route("/users", get(handlers::list_users))
            .route("/users/findByName", get(handlers::find_user_by_name))
            .route("/users/findByEmail", get(handlers::find_user_by_email))
            .route("/users/:id", get(handlers::get_user))
            // Association routes
            .route("/associations", post(handlers::create_association))
            .route("/associations/:id", delete(handlers::delete_association));

        Router::new()
            .nest(API_ROOT, api)
            // Health check
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}
