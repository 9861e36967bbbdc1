//! List trait for fetching collections of entities.

use async_trait::async_trait;

use crate::client::RestClient;
use crate::error::Result;
use crate::pagination::{paginate, Page, PageRequest};

/// List entities with pagination support.
///
/// Implementors provide one page; [`list`](Self::list) turns that into
/// "one page or every page" per [`PageRequest`].
///
/// # Example
///
/// ```ignore
/// use cbapi::{ItemQuery, List, PageRequest, RestClient, TrackerItem};
///
/// let client = RestClient::from_env()?;
///
/// // Fetch a single page
/// let page = TrackerItem::list_page(&client, &ItemQuery::Tracker(10), 1, 50).await?;
///
/// // Fetch all pages
/// let all = TrackerItem::list(&client, &ItemQuery::Tracker(10), PageRequest::all(500)).await?;
/// ```
#[async_trait]
pub trait List: Sized + Send {
    /// What to list (the parent entity, a search, ...).
    type Query: Send + Sync;

    /// List entities matching the query (single page).
    ///
    /// # Arguments
    ///
    /// * `client` - The codeBeamer API client
    /// * `query` - What to list
    /// * `page` - Page number (1-indexed)
    /// * `page_size` - Number of items per page (1 to 500)
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_page(
        client: &RestClient,
        query: &Self::Query,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Self>>;

    /// List one page, or every page when `request` is
    /// [`PageRequest::all`].
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails; a failure after the
    /// first page is reported as
    /// [`CbError::PaginationAborted`](crate::CbError::PaginationAborted)
    /// and no partial result is returned.
    async fn list(client: &RestClient, query: &Self::Query, request: PageRequest) -> Result<Vec<Self>> {
        paginate(request, |page, page_size| Self::list_page(client, query, page, page_size)).await
    }

    /// List every entity matching the query at the default page size.
    async fn list_all(client: &RestClient, query: &Self::Query) -> Result<Vec<Self>> {
        Self::list(client, query, PageRequest::default()).await
    }
}
