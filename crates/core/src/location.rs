//! Host location boundary.
//!
//! The host environment exposes two primitives: read the current query
//! string, and replace it. Replacing never adds a history entry.

use std::cell::{Cell, RefCell};

use url::Url;

use crate::query::QueryString;

/// Read/replace access to the current URL's query string
pub trait Location {
    fn query(&self) -> QueryString;

    /// Replace the current query string (no new history entry)
    fn replace_query(&self, query: &QueryString);
}

/// In-process location backed by a `url::Url`.
///
/// Shared between plugins as `Rc<dyn Location>`; everything runs on one thread.
#[derive(Debug)]
pub struct MemoryLocation {
    url: RefCell<Url>,
    replacements: Cell<usize>,
}

impl MemoryLocation {
    pub const DEFAULT_HREF: &'static str = "http://localhost/";

    pub fn new(href: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: RefCell::new(Url::parse(href)?),
            replacements: Cell::new(0),
        })
    }

    /// Location with the default origin and the given query string
    pub fn with_query(query: &str) -> Self {
        let location = Self::default();
        location.replace_query(&QueryString::parse(query));
        location.replacements.set(0);
        location
    }

    /// Full URL as text
    pub fn href(&self) -> String {
        self.url.borrow().to_string()
    }

    /// Number of `replace_query` calls so far
    pub fn replacements(&self) -> usize {
        self.replacements.get()
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self {
            url: RefCell::new(Url::parse(Self::DEFAULT_HREF).expect("default href is valid")),
            replacements: Cell::new(0),
        }
    }
}

impl Location for MemoryLocation {
    fn query(&self) -> QueryString {
        self.url
            .borrow()
            .query()
            .map(QueryString::parse)
            .unwrap_or_default()
    }

    fn replace_query(&self, query: &QueryString) {
        let mut url = self.url.borrow_mut();
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&query.to_string()));
        }
        self.replacements.set(self.replacements.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_location_replace() {
        let location = MemoryLocation::new("https://example.com/table?sort=id").unwrap();
        assert_eq!(location.query().get("sort"), Some("id"));

        let mut query = location.query();
        query.set("direction", "desc");
        location.replace_query(&query);

        assert_eq!(location.href(), "https://example.com/table?sort=id&direction=desc");
        assert_eq!(location.replacements(), 1);
    }

    #[test]
    fn test_with_query_does_not_count() {
        let location = MemoryLocation::with_query("page=3");
        assert_eq!(location.query().get("page"), Some("3"));
        assert_eq!(location.replacements(), 0);
    }

    #[test]
    fn test_empty_query_clears() {
        let location = MemoryLocation::with_query("page=3");
        location.replace_query(&QueryString::new());
        assert_eq!(location.href(), "http://localhost/");
    }
}
