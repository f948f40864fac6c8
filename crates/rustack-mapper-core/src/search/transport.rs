//! The network boundary for paginated searches.

use rustack_mapper_model::{SearchMode, SearchRequest, SearchResponse};

/// Issues one `Query` or `Scan` call and returns the raw page.
///
/// Implementations own retries, timeouts and credentials. Errors are passed
/// back to the caller of the cursor unchanged.
pub trait SearchTransport {
    /// Fetch one page for `request`.
    fn search_items(
        &self,
        mode: SearchMode,
        request: &SearchRequest,
    ) -> anyhow::Result<SearchResponse>;
}

impl<T: SearchTransport + ?Sized> SearchTransport for &T {
    fn search_items(
        &self,
        mode: SearchMode,
        request: &SearchRequest,
    ) -> anyhow::Result<SearchResponse> {
        (**self).search_items(mode, request)
    }
}
