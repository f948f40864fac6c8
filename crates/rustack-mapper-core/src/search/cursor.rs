//! Paginated result cursor.
//!
//! A [`SearchIterator`] keeps a FIFO of decoded objects and only calls the
//! transport when that buffer is empty and a continuation token remains.
//! Empty pages do not end iteration; the cursor keeps following tokens until
//! it has an item or the final page arrives.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use rustack_mapper_model::Item;
use tracing::debug;

use super::builder::PreparedSearch;
use super::transport::SearchTransport;
use crate::error::{Cardinality, MapperError, MapperResult};
use crate::object::ModelObject;
use crate::tracking;

/// Iterates the results of a prepared query or scan.
pub struct SearchIterator<'t, T: SearchTransport + ?Sized> {
    transport: &'t T,
    search: PreparedSearch,
    buffer: VecDeque<ModelObject>,
    count: usize,
    scanned_count: usize,
    yielded: usize,
    tokens_exhausted: bool,
    token: Option<Item>,
    first: Option<ModelObject>,
}

impl<'t, T: SearchTransport + ?Sized> SearchIterator<'t, T> {
    pub(crate) fn new(transport: &'t T, search: PreparedSearch) -> Self {
        Self {
            transport,
            search,
            buffer: VecDeque::new(),
            count: 0,
            scanned_count: 0,
            yielded: 0,
            tokens_exhausted: false,
            token: None,
            first: None,
        }
    }

    /// Items matched by every page fetched so far.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.count
    }

    /// Items evaluated by every page fetched so far, before filtering.
    #[must_use]
    pub fn scanned_count(&self) -> usize {
        self.scanned_count
    }

    /// Items returned to the caller so far.
    #[must_use]
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Decoded items waiting in the buffer.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn limit_reached(&self) -> bool {
        self.search.limit() > 0 && self.yielded >= self.search.limit()
    }

    /// No further item can be produced without a [`reset`](Self::reset).
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.limit_reached() || (self.buffer.is_empty() && self.tokens_exhausted)
    }

    /// Return to the initial state, keeping the compiled request.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.count = 0;
        self.scanned_count = 0;
        self.yielded = 0;
        self.tokens_exhausted = false;
        self.token = None;
        self.first = None;
        debug!(
            mode = %self.search.mode(),
            table = %self.search.request().table_name,
            "search cursor reset"
        );
    }

    /// Produce the next item, fetching pages as needed.
    pub fn step(&mut self) -> MapperResult<Option<ModelObject>> {
        if self.limit_reached() {
            return Ok(None);
        }
        while self.buffer.is_empty() && !self.tokens_exhausted {
            self.fetch_page()?;
            for _ in 0..self.search.prefetch() {
                if self.tokens_exhausted {
                    break;
                }
                self.fetch_page()?;
            }
        }
        let next = self.buffer.pop_front();
        if next.is_some() {
            self.yielded += 1;
        }
        Ok(next)
    }

    fn fetch_page(&mut self) -> MapperResult<()> {
        let mut request = self.search.request().clone();
        request.exclusive_start_key.clone_from(&self.token);

        let page = self
            .transport
            .search_items(self.search.mode(), &request)
            .map_err(MapperError::Transport)?;

        // Decode the whole page before touching any state, so a bad item
        // leaves the cursor where it was.
        let mut decoded = Vec::with_capacity(page.items.len());
        for item in &page.items {
            let mut obj = ModelObject::from_item(
                Arc::clone(self.search.schema()),
                item,
                self.search.projection(),
            )?;
            tracking::on_loaded(&mut obj)?;
            decoded.push(obj);
        }

        self.count += page.count;
        self.scanned_count += page.scanned_count;
        self.token = page.continuation_token().cloned();
        self.tokens_exhausted = self.token.is_none();
        self.buffer.extend(decoded);

        debug!(
            mode = %self.search.mode(),
            table = %request.table_name,
            items = page.items.len(),
            scanned = page.scanned_count,
            more = !self.tokens_exhausted,
            "fetched search page"
        );
        Ok(())
    }

    /// The first result. Later calls return the same object until `reset`.
    pub fn first(&mut self) -> MapperResult<ModelObject> {
        if let Some(first) = &self.first {
            return Ok(first.clone());
        }
        match self.step()? {
            Some(obj) => {
                self.first = Some(obj.clone());
                Ok(obj)
            }
            None => Err(MapperError::ConstraintViolation {
                expected: Cardinality::AtLeastOne,
                message: format!("{} did not find any results", self.search.mode()),
            }),
        }
    }

    /// The only result. Always steps exactly twice.
    pub fn one(&mut self) -> MapperResult<ModelObject> {
        let first = self.step()?;
        let second = self.step()?;
        match (first, second) {
            (Some(obj), None) => Ok(obj),
            (None, _) => Err(MapperError::ConstraintViolation {
                expected: Cardinality::ExactlyOne,
                message: format!("{} did not find any results", self.search.mode()),
            }),
            (Some(_), Some(_)) => Err(MapperError::ConstraintViolation {
                expected: Cardinality::ExactlyOne,
                message: format!("{} found more than one result", self.search.mode()),
            }),
        }
    }
}

impl<T: SearchTransport + ?Sized> Iterator for SearchIterator<'_, T> {
    type Item = MapperResult<ModelObject>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().transpose()
    }
}

impl<T: SearchTransport + ?Sized> fmt::Debug for SearchIterator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIterator")
            .field("mode", &self.search.mode())
            .field("table", &self.search.request().table_name)
            .field("buffered", &self.buffer.len())
            .field("count", &self.count)
            .field("scanned_count", &self.scanned_count)
            .field("yielded", &self.yielded)
            .field("tokens_exhausted", &self.tokens_exhausted)
            .finish_non_exhaustive()
    }
}
