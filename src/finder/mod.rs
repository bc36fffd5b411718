//! Generic paginated finders
//!
//! Every listing API is driven through [`PageSource`]; the search functions
//! only know about pages, cursors and a match predicate.
//!
//! - [`find_first`] stops at the first match (the read path of most resources)
//! - [`find_all`] keeps scanning and collects every match
//! - [`find_single`] requires exactly one match
//!
//! # Example
//!
//! ```ignore
//! use provkit::context::OperationContext;
//! use provkit::finder::{find_first, MemoryPages};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let ctx = OperationContext::new("find queue");
//!     let mut pages = MemoryPages::new(vec![vec!["a", "b"], vec!["c"]]);
//!     let found = find_first(&ctx, &mut pages, |name| *name == "c").await?;
//!     assert_eq!(found, "c");
//!     Ok(())
//! }
//! ```

mod page;
mod search;

pub use page::{MemoryPages, Page, PageSource};
pub use search::{find_all, find_first, find_single};
