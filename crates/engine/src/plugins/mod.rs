//! Built-in plugins.

pub mod filter;
pub mod page;
pub mod sort;
pub mod sort_cache;

pub use filter::{FilterPlugin, FILTER_STAGE};
pub use page::{PagePlugin, PAGE_STAGE};
pub use sort::{Direction, SortBuilder, SortPlugin, SORT_STAGE};
pub use sort_cache::SortCache;
