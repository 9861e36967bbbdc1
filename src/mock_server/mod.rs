//! Mock codeBeamer API server for E2E testing.
//!
//! This module provides an in-memory mock server that simulates the
//! codeBeamer REST API for integration and end-to-end testing. Unlike
//! wiremock which mocks at the HTTP level per-test, this server maintains
//! state across requests, enabling realistic workflow testing (create an
//! item, write its fields, read them back).
//!
//! # Example
//!
//! ```ignore
//! use cbapi::mock_server::MockServer;
//! use cbapi::Codebeamer;
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let cb = Codebeamer::new(server.url(), "bond", "007").unwrap();
//!
//!     // Server comes with default fixtures
//!     let project = cb.get_project("Apollo").await.unwrap().unwrap();
//!     assert_eq!(project.id(), 1);
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{
    DefaultScenario, Fixtures, COMPONENT_FIELD, ID_FIELD, ROOT_CAUSE_FIELD, SCORE_FIELD, STATUS_FIELD,
};
pub use server::MockServer;
pub use state::{ItemFields, MockState};
