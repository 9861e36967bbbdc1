//! Pagination utilities for codeBeamer listing endpoints.
//!
//! Listing endpoints answer with an envelope `{"total": n, "<key>": [...]}`.
//! Callers ask for either one page or every page through the same
//! [`PageRequest`] value: page `0` means "fetch all pages".

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CbError, Result};

/// Smallest page size the server accepts.
pub const MIN_PAGE_SIZE: u32 = 1;

/// Largest page size the server accepts.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Default page size for list operations.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Maximum pages to fetch (safety limit).
const MAX_PAGES: u32 = 10_000;

/// Clamp `value` into `[min, max]`.
pub fn clamp<T: Ord>(value: T, min: T, max: T) -> T {
    value.max(min).min(max)
}

/// Number of pages needed to hold `total` items at `page_size` per page.
pub fn pages(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}

/// A page of results from the codeBeamer API.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize")]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of items across all pages (if known).
    pub total: Option<u64>,
    /// Current page number (1-indexed).
    pub page: u32,
    /// Number of items per page.
    pub page_size: u32,
    /// Whether there are more pages.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Create a new page from items and pagination info.
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total: Option<u64>) -> Self {
        let has_more = match total {
            Some(t) => (u64::from(page) * u64::from(page_size)) < t,
            None => items.len() >= page_size as usize,
        };
        Self {
            items,
            total,
            page,
            page_size,
            has_more,
        }
    }

    /// Map the items with a fallible conversion, failing on the first error.
    pub fn try_map<U, F: FnMut(T) -> Result<U>>(self, f: F) -> Result<Page<U>> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<Vec<U>>>()?,
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            has_more: self.has_more,
        })
    }
}

impl Page<Value> {
    /// Split a listing envelope into a page of raw payloads.
    ///
    /// `key` names the array inside the envelope (`itemRefs`, `references`,
    /// `users`, ...).
    pub fn from_envelope(mut envelope: Value, key: &str, page: u32, page_size: u32) -> Result<Self> {
        let total = envelope.get("total").and_then(Value::as_u64);
        let items = match envelope.get_mut(key).map(Value::take) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(CbError::MalformedPayload(format!(
                    "listing field '{key}' is not an array"
                )))
            }
        };
        Ok(Self::new(items, page, page_size, total))
    }
}

/// Which page(s) of a listing to fetch.
///
/// The page size is clamped to `[1, 500]` on construction; out-of-range
/// values are corrected silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Page `0` fetches every page, anything else that single page.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size: clamp(page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE),
        }
    }

    /// Fetch every page.
    #[must_use]
    pub fn all(page_size: u32) -> Self {
        Self::new(0, page_size)
    }

    /// Fetch exactly one page (1-indexed).
    #[must_use]
    pub fn page(page: u32, page_size: u32) -> Self {
        Self::new(page.max(1), page_size)
    }

    /// Whether this request aggregates every page.
    pub fn is_all(&self) -> bool {
        self.page == 0
    }

    /// The requested page number, `0` for all pages.
    pub fn page_number(&self) -> u32 {
        self.page
    }

    /// The clamped page size.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::all(DEFAULT_PAGE_SIZE)
    }
}

/// Query parameters for paginated requests.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    /// Page number (1-indexed).
    pub page: u32,
    /// Number of items per page.
    pub page_size: u32,
}

impl PageParams {
    /// Create pagination params for a specific page.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }
}

/// Fetch one page or all pages of a listing.
///
/// `fetch` is called with `(page, page_size)`. For a fetch-all request the
/// first page's `total` decides how many more pages are requested; pages
/// are requested strictly one after another and concatenated in request
/// order. If any page after the first fails, nothing is returned and the
/// failure is reported as [`CbError::PaginationAborted`].
pub async fn paginate<T, F, Fut>(request: PageRequest, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let page_size = request.page_size();

    if !request.is_all() {
        return Ok(fetch(request.page_number(), page_size).await?.items);
    }

    let first = fetch(1, page_size).await?;
    let total_pages = first.total.map(|total| pages(total, page_size));
    let mut has_more = first.has_more;
    let mut items = first.items;
    let mut page = 1;

    loop {
        let more = match total_pages {
            Some(total_pages) => u64::from(page) < total_pages,
            None => has_more,
        };
        if !more {
            break;
        }

        page += 1;

        // Safety limit to prevent infinite loops
        if page > MAX_PAGES {
            tracing::warn!("Reached pagination limit of {} pages, stopping", MAX_PAGES);
            break;
        }

        let next = fetch(page, page_size)
            .await
            .map_err(|source| CbError::PaginationAborted {
                page,
                source: Box::new(source),
            })?;
        has_more = next.has_more;
        items.extend(next.items);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn numbered_page(page: u32, page_size: u32, total: u64) -> Page<u64> {
        let start = u64::from(page - 1) * u64::from(page_size);
        let end = (start + u64::from(page_size)).min(total);
        Page::new((start..end).collect(), page, page_size, Some(total))
    }

    #[test]
    fn test_pages() {
        assert_eq!(pages(0, 25), 0);
        assert_eq!(pages(1, 25), 1);
        assert_eq!(pages(25, 25), 1);
        assert_eq!(pages(26, 25), 2);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(0, 1, 500), 1);
        assert_eq!(clamp(501, 1, 500), 500);
        assert_eq!(clamp(250, 1, 500), 250);
    }

    #[test]
    fn test_page_request_clamps_size() {
        assert_eq!(PageRequest::all(0).page_size(), 1);
        assert_eq!(PageRequest::page(2, 9000).page_size(), 500);
        assert!(PageRequest::all(25).is_all());
        assert!(!PageRequest::page(3, 25).is_all());
    }

    #[test]
    fn test_page_params_query_string() {
        let query = serde_qs::to_string(&PageParams::new(2, 50)).unwrap();
        assert_eq!(query, "page=2&pageSize=50");
    }

    #[test]
    fn test_page_has_more_with_total() {
        // Page 1 of 3 (total 250, 100 per page)
        let page: Page<i32> = Page::new(vec![1; 100], 1, 100, Some(250));
        assert!(page.has_more);

        // Page 3 of 3
        let page: Page<i32> = Page::new(vec![1; 50], 3, 100, Some(250));
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_has_more_without_total() {
        // Full page suggests more
        let page: Page<i32> = Page::new(vec![1; 100], 1, 100, None);
        assert!(page.has_more);

        // Partial page means no more
        let page: Page<i32> = Page::new(vec![1; 50], 1, 100, None);
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_from_envelope() {
        let envelope = serde_json::json!({
            "page": 1,
            "pageSize": 2,
            "total": 3,
            "itemRefs": [{"id": 1}, {"id": 2}]
        });
        let page = Page::from_envelope(envelope, "itemRefs", 1, 2).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(3));
        assert!(page.has_more);

        let bad = serde_json::json!({"total": 1, "itemRefs": {"id": 1}});
        assert!(matches!(
            Page::from_envelope(bad, "itemRefs", 1, 2),
            Err(CbError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_paginate_fetch_all_in_order() {
        let calls = RefCell::new(Vec::new());
        let items = tokio_test::block_on(paginate(PageRequest::all(50), |page, size| {
            calls.borrow_mut().push(page);
            let result = Ok(numbered_page(page, size, 120));
            async move { result }
        }))
        .unwrap();

        assert_eq!(*calls.borrow(), vec![1, 2, 3]);
        assert_eq!(items.len(), 120);
        assert_eq!(items, (0..120).collect::<Vec<u64>>());
    }

    #[test]
    fn test_paginate_single_page() {
        let calls = RefCell::new(Vec::new());
        let items = tokio_test::block_on(paginate(PageRequest::page(2, 50), |page, size| {
            calls.borrow_mut().push(page);
            let result = Ok(numbered_page(page, size, 120));
            async move { result }
        }))
        .unwrap();

        assert_eq!(*calls.borrow(), vec![2]);
        assert_eq!(items, (50..100).collect::<Vec<u64>>());
    }

    #[test]
    fn test_paginate_empty_listing() {
        let calls = RefCell::new(0);
        let items = tokio_test::block_on(paginate(PageRequest::all(25), |page, size| {
            *calls.borrow_mut() += 1;
            let result = Ok(numbered_page(page, size, 0));
            async move { result }
        }))
        .unwrap();

        assert_eq!(*calls.borrow(), 1);
        assert!(items.is_empty());
    }

    #[test]
    fn test_paginate_aborts_on_failed_page() {
        let calls = RefCell::new(Vec::new());
        let result = tokio_test::block_on(paginate(PageRequest::all(50), |page, size| {
            calls.borrow_mut().push(page);
            let result = if page == 2 {
                Err(CbError::ServerError {
                    message: "boom".to_string(),
                    status_code: Some(500),
                })
            } else {
                Ok(numbered_page(page, size, 120))
            };
            async move { result }
        }));

        assert!(matches!(result, Err(CbError::PaginationAborted { page: 2, .. })));
        assert_eq!(*calls.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_paginate_first_page_failure_is_not_wrapped() {
        let result: Result<Vec<u64>> = tokio_test::block_on(paginate(PageRequest::all(50), |_, _| async {
            Err(CbError::ServerError {
                message: "down".to_string(),
                status_code: Some(503),
            })
        }));

        assert!(matches!(result, Err(CbError::ServerError { .. })));
    }

    #[test]
    fn test_paginate_without_total_uses_page_fill() {
        let items = tokio_test::block_on(paginate(PageRequest::all(2), |page, size| {
            let items: Vec<u32> = match page {
                1 => vec![1, 2],
                2 => vec![3],
                _ => vec![],
            };
            let result = Ok(Page::new(items, page, size, None));
            async move { result }
        }))
        .unwrap();

        assert_eq!(items, vec![1, 2, 3]);
    }
}
