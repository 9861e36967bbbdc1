//! Get trait for fetching single entities.

use async_trait::async_trait;

use crate::client::RestClient;
use crate::error::Result;

/// Fetch a single entity by ID.
///
/// Implement this trait for entity types that can be fetched individually
/// through a detail endpoint. The result is always a fully loaded entity.
///
/// # Example
///
/// ```ignore
/// use cbapi::{Get, RestClient, TrackerItem};
///
/// let client = RestClient::from_env()?;
/// let item = TrackerItem::get(&client, 1234).await?;
/// ```
#[async_trait]
pub trait Get: Sized {
    /// The ID type for this entity (an integer id, or a pair for
    /// tracker-scoped entities).
    type Id;

    /// Fetch the entity by ID.
    ///
    /// # Errors
    ///
    /// Returns [`CbError::NotFound`](crate::CbError::NotFound) if the entity
    /// does not exist, or another error if the request fails.
    async fn get(client: &RestClient, id: Self::Id) -> Result<Self>;
}
