//! Result pages and page sources

use crate::context::OperationContext;
use anyhow::{anyhow, Result};

/// One batch of results from a listing call.
///
/// Elements are optional because listing APIs return `null` entries; the
/// page is the last one when it carries no continuation cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    items: Vec<Option<T>>,
    next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// A page whose elements are all present
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self {
            items: items.into_iter().map(Some).collect(),
            next_cursor,
        }
    }

    /// A page that may contain missing elements
    pub fn with_gaps(items: Vec<Option<T>>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    /// A page with no elements at all (a `null` or missing item array)
    pub fn empty(next_cursor: Option<String>) -> Self {
        Self {
            items: Vec::new(),
            next_cursor,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Split into present elements (in order) and the continuation cursor
    pub fn into_parts(self) -> (impl Iterator<Item = T>, Option<String>) {
        (self.items.into_iter().flatten(), self.next_cursor)
    }
}

/// Something that can produce result pages one at a time.
///
/// `fetch_page` is called with `None` for the first page and with the
/// previous page's cursor afterwards, until a page reports it is the last.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    type Item;

    /// Fetch the page identified by `cursor`
    async fn fetch_page(
        &mut self,
        ctx: &OperationContext,
        cursor: Option<String>,
    ) -> Result<Page<Self::Item>>;

    /// Human-readable description of the listing request, for diagnostics
    fn describe(&self) -> String;
}

/// Page source over pages already held in memory.
///
/// Cursors are page indexes. Records every cursor it was asked for, which
/// makes it handy for checking traversal order.
#[derive(Debug, Clone)]
pub struct MemoryPages<T> {
    pages: Vec<Vec<Option<T>>>,
    fail_at: Option<usize>,
    requested: Vec<Option<String>>,
}

impl<T: Clone> MemoryPages<T> {
    pub fn new(pages: Vec<Vec<T>>) -> Self {
        Self::with_gaps(
            pages
                .into_iter()
                .map(|page| page.into_iter().map(Some).collect())
                .collect(),
        )
    }

    pub fn with_gaps(pages: Vec<Vec<Option<T>>>) -> Self {
        Self {
            pages,
            fail_at: None,
            requested: Vec::new(),
        }
    }

    /// Make the fetch of page `index` fail
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Cursors requested so far, in call order
    pub fn requested(&self) -> &[Option<String>] {
        &self.requested
    }

    pub fn fetch_count(&self) -> usize {
        self.requested.len()
    }
}

impl<T: Clone> PageSource for MemoryPages<T> {
    type Item = T;

    async fn fetch_page(
        &mut self,
        _ctx: &OperationContext,
        cursor: Option<String>,
    ) -> Result<Page<T>> {
        self.requested.push(cursor.clone());

        let index = match cursor.as_deref() {
            None => 0,
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| anyhow!("invalid page cursor: {}", c))?,
        };

        if self.fail_at == Some(index) {
            return Err(anyhow!("page {} unavailable", index));
        }

        if self.pages.is_empty() && index == 0 {
            return Ok(Page::empty(None));
        }

        let Some(items) = self.pages.get(index) else {
            return Err(anyhow!("page {} out of range", index));
        };

        let next_cursor = if index + 1 < self.pages.len() {
            Some((index + 1).to_string())
        } else {
            None
        };

        Ok(Page::with_gaps(items.clone(), next_cursor))
    }

    fn describe(&self) -> String {
        format!("in-memory listing ({} pages)", self.pages.len())
    }
}
