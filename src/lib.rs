//! codeBeamer API client library.
//!
//! A Rust library for the codeBeamer ALM REST API (v3). Entities such as
//! [`Project`], [`Tracker`] and [`TrackerItem`] are built from whatever the
//! server returned: list endpoints yield partial references, which complete
//! themselves with a single detail request the first time an attribute
//! outside `id`/`name` is needed.
//!
//! # Quick Start
//!
//! ```no_run
//! use cbapi::{Codebeamer, FieldInput};
//!
//! #[tokio::main]
//! async fn main() -> cbapi::Result<()> {
//!     // Create client from environment variables
//!     let cb = Codebeamer::from_env()?;
//!
//!     // Find a tracker by name (walks every project) and page through items
//!     let tracker = cb.get_tracker("Bugs").await?.expect("tracker exists");
//!     for item in tracker.get_items(0, 100).await? {
//!         let detail = item.detail().await?;
//!         println!("{} {:?}", item.name(), detail.story_points);
//!     }
//!
//!     // Write a field value
//!     if let Some(mut item) = cb.get_item(1234).await? {
//!         item.update_field("Root Cause", FieldInput::from("config")).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`RestClient`] - authenticated HTTP transport, shared by every entity
//! - [`Lazy`] - at-most-once loading cell behind every partial entity
//! - [`Get`] / [`List`] - fetch by id and paged listing traits
//! - [`FieldValue`] - typed value of a tracker item field
//! - [`Codebeamer`] - entry point with id/name/key finders
//!
//! # Configuration
//!
//! The client reads configuration from environment variables:
//!
//! - `CODEBEAMER_URL` (required) - Server URL, e.g. `https://cb.example.com`
//! - `CODEBEAMER_USERNAME` / `CODEBEAMER_PASSWORD` (required) - Basic auth
//! - `CODEBEAMER_TIMEOUT_SECS` (optional) - Request timeout, default 60

mod client;
mod codebeamer;
mod error;
mod lazy;
mod models;
mod pagination;
mod traits;

pub mod cli;
pub mod output;
pub mod timestamp;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use client::{RestClient, RestClientBuilder};
pub use codebeamer::Codebeamer;
pub use error::{CbError, NotFoundExt, Result};
pub use lazy::Lazy;
pub use pagination::{clamp, pages, paginate, Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
pub use timestamp::{Timestamp, TIMESTAMP_FORMAT};

// Re-export traits
pub use traits::{Get, List};

// Re-export models
pub use models::*;
