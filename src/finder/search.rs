//! Paginated search
//!
//! Pages are fetched strictly in order, one at a time. Fetch errors abort
//! the search and are returned as-is.

use super::page::PageSource;
use crate::context::OperationContext;
use crate::error::{NotFoundError, TooManyResultsError};
use anyhow::Result;
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Walk every page, handing each present element to `visit` until it breaks.
///
/// Returns the element `visit` broke with, or `None` once the last page has
/// been consumed. A cursor that was already followed ends the walk.
async fn traverse<S, F>(
    ctx: &OperationContext,
    source: &mut S,
    mut visit: F,
) -> Result<Option<S::Item>>
where
    S: PageSource,
    F: FnMut(S::Item) -> ControlFlow<S::Item>,
{
    let mut cursor: Option<String> = None;
    let mut seen: HashSet<String> = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = source.fetch_page(ctx, cursor.clone()).await?;
        pages += 1;

        let (items, next) = page.into_parts();
        for item in items {
            if let ControlFlow::Break(found) = visit(item) {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    pages,
                    "match found, stopping pagination"
                );
                return Ok(Some(found));
            }
        }

        match next {
            None => break,
            Some(next) if !seen.insert(next.clone()) => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    cursor = %next,
                    "page source repeated its cursor, stopping pagination"
                );
                break;
            },
            Some(next) => cursor = Some(next),
        }
    }

    tracing::debug!(request_id = %ctx.request_id(), pages, "pagination exhausted");
    Ok(None)
}

/// Return the first element matching `predicate`.
///
/// Stops fetching as soon as a match is seen. When no page holds a match,
/// fails with [`NotFoundError`] describing the listing request.
pub async fn find_first<S, P>(
    ctx: &OperationContext,
    source: &mut S,
    mut predicate: P,
) -> Result<S::Item>
where
    S: PageSource,
    P: FnMut(&S::Item) -> bool,
{
    let found = traverse(ctx, source, |item| {
        if predicate(&item) {
            ControlFlow::Break(item)
        } else {
            ControlFlow::Continue(())
        }
    })
    .await?;

    found.ok_or_else(|| NotFoundError::new(source.describe()).into())
}

/// Collect every element matching `predicate` across all pages
pub async fn find_all<S, P>(
    ctx: &OperationContext,
    source: &mut S,
    mut predicate: P,
) -> Result<Vec<S::Item>>
where
    S: PageSource,
    P: FnMut(&S::Item) -> bool,
{
    let mut matches = Vec::new();
    traverse(ctx, source, |item| {
        if predicate(&item) {
            matches.push(item);
        }
        ControlFlow::Continue(())
    })
    .await?;
    Ok(matches)
}

/// Return the only element matching `predicate`.
///
/// Scans every page. Zero matches is a [`NotFoundError`], more than one is a
/// [`TooManyResultsError`].
pub async fn find_single<S, P>(
    ctx: &OperationContext,
    source: &mut S,
    predicate: P,
) -> Result<S::Item>
where
    S: PageSource,
    P: FnMut(&S::Item) -> bool,
{
    let mut matches = find_all(ctx, source, predicate).await?;
    match matches.len() {
        0 => Err(NotFoundError::new(source.describe())
            .with_message("empty result")
            .into()),
        1 => Ok(matches.remove(0)),
        count => Err(TooManyResultsError {
            count,
            last_request: source.describe(),
        }
        .into()),
    }
}
