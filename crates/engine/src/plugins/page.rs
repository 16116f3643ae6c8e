//! Pagination plugin
//!
//! Exports:
//! - stage `tfPage` (runs last unless given a priority)
//! - state `page` (URL-backed, 1-indexed, writable), `lastPage` (derived)
//! - mutators `setPage`, `nextPage`, `prevPage`
//! - misc `rowsPerPage`
//!
//! The stage remembers the last input it saw. When a different sequence
//! arrives (upstream filter or sort changed the result set) it resets to page 1.

use std::rc::Rc;

use log::debug;
use plugtable_core::{parse, FieldConfig, Location, StateUrl};
use serde_json::{json, Value};

use crate::error::PluginError;
use crate::plugin::{arg, Mutator, Plugin, StateCell};
use crate::stage::StageDecl;

pub const PAGE_STAGE: &str = "tfPage";

/// Largest page number whose URL form is exact
pub const MAX_PAGE: u64 = 1 << 53;

fn max_page() -> usize {
    usize::try_from(MAX_PAGE).unwrap_or(usize::MAX)
}

pub struct PagePlugin<T> {
    rows_per_page: usize,
    page: usize,
    last_page: usize,
    seen: Option<Vec<T>>,
    url: StateUrl<usize>,
    priority: Option<i64>,
}

impl<T: Clone + PartialEq> PagePlugin<T> {
    pub fn new(rows_per_page: usize, location: Rc<dyn Location>) -> Result<Self, PluginError> {
        Self::with_key(rows_per_page, "page", location)
    }

    /// Read the page from query parameter `key` instead of `page`
    pub fn with_key(
        rows_per_page: usize,
        key: impl Into<String>,
        location: Rc<dyn Location>,
    ) -> Result<Self, PluginError> {
        if rows_per_page == 0 {
            return Err(PluginError::Config("rows per page must be at least 1".into()));
        }
        let (url, page) = StateUrl::open(
            FieldConfig::new(key, |raw| parse::within(raw, 1usize, max_page()), 1),
            location,
        );
        Ok(Self {
            rows_per_page,
            page,
            last_page: 0,
            seen: None,
            url,
            priority: None,
        })
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn last_page(&self) -> usize {
        self.last_page
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    pub fn set_page(&mut self, page: usize) -> Result<(), PluginError> {
        if page == 0 {
            return Err(PluginError::invalid_argument("setPage", "pages start at 1"));
        }
        if page > max_page() {
            return Err(PluginError::invalid_argument(
                "setPage",
                format!("page {} is above the maximum of {}", page, MAX_PAGE),
            ));
        }
        self.url.update(&self.page, &page);
        self.page = page;
        Ok(())
    }

    fn paginate(&mut self, rows: &[T]) -> Vec<T> {
        let changed = self.seen.as_deref().is_some_and(|previous| previous != rows);
        if changed {
            if self.page != 1 {
                debug!("page: input changed, resetting page {} to 1", self.page);
            }
            self.url.update(&self.page, &1);
            self.page = 1;
        }
        if changed || self.seen.is_none() {
            self.seen = Some(rows.to_vec());
        }

        self.last_page = rows.len().div_ceil(self.rows_per_page);
        let start = (self.page - 1).saturating_mul(self.rows_per_page);
        rows.iter().skip(start).take(self.rows_per_page).cloned().collect()
    }
}

impl<T: Clone + PartialEq> Plugin<T> for PagePlugin<T> {
    fn name(&self) -> &str {
        "page"
    }

    fn stages(&self) -> Vec<StageDecl> {
        vec![StageDecl::new(PAGE_STAGE, self.priority)]
    }

    fn run_stage(&mut self, key: &str, rows: &[T]) -> Result<Vec<T>, PluginError> {
        match key {
            PAGE_STAGE => Ok(self.paginate(rows)),
            _ => Err(PluginError::UnknownStage(key.to_string())),
        }
    }

    fn state(&self) -> Vec<(String, StateCell)> {
        vec![
            ("page".into(), StateCell::writable(json!(self.page), PAGE_STAGE)),
            ("lastPage".into(), StateCell::read_only(json!(self.last_page))),
        ]
    }

    fn set_state(&mut self, name: &str, value: Value) -> Result<(), PluginError> {
        match name {
            "page" => self.set_page(arg(name, value)?),
            _ => Err(PluginError::UnknownState(name.to_string())),
        }
    }

    fn mutators(&self) -> Vec<Mutator> {
        vec![
            Mutator::new("setPage", Some(PAGE_STAGE)),
            Mutator::new("nextPage", Some(PAGE_STAGE)),
            Mutator::new("prevPage", Some(PAGE_STAGE)),
        ]
    }

    fn apply(&mut self, name: &str, value: Value) -> Result<(), PluginError> {
        match name {
            "setPage" => self.set_page(arg(name, value)?),
            // Stops at the last page; with no rows there is only page 1
            "nextPage" => self.set_page(self.page.saturating_add(1).min(self.last_page.max(1))),
            "prevPage" => self.set_page(self.page.saturating_sub(1).max(1)),
            _ => Err(PluginError::UnknownMutator(name.to_string())),
        }
    }

    fn misc(&self) -> Vec<(String, Value)> {
        vec![("rowsPerPage".into(), json!(self.rows_per_page))]
    }
}
