//! Column metadata supplied by the host: title, sortability and comparator per field.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Row comparator for one field
pub type Compare<T> = Rc<dyn Fn(&T, &T) -> Ordering>;

pub struct Column<T> {
    pub title: String,
    pub sortable: bool,
    pub compare: Option<Compare<T>>,
}

impl<T> Column<T> {
    /// A display-only column
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sortable: false,
            compare: None,
        }
    }

    /// A sortable column ordered by `compare`
    pub fn sortable<F>(title: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + 'static,
    {
        Self {
            title: title.into(),
            sortable: true,
            compare: Some(Rc::new(compare)),
        }
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            sortable: self.sortable,
            compare: self.compare.clone(),
        }
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("title", &self.title)
            .field("sortable", &self.sortable)
            .field("compare", &self.compare.is_some())
            .finish()
    }
}

/// Ordered field -> column mapping
pub struct Columns<T> {
    entries: Vec<(String, Column<T>)>,
}

impl<T> Default for Columns<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> Columns<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the column for `field`; a new field goes last
    pub fn insert(&mut self, field: impl Into<String>, column: Column<T>) {
        let field = field.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = column,
            None => self.entries.push((field, column)),
        }
    }

    pub fn with(mut self, field: impl Into<String>, column: Column<T>) -> Self {
        self.insert(field, column);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Column<T>> {
        self.entries.iter().find(|(f, _)| f == field).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column<T>)> {
        self.entries.iter().map(|(f, c)| (f.as_str(), c))
    }

    pub fn fields(&self) -> Vec<&str> {
        self.entries.iter().map(|(f, _)| f.as_str()).collect()
    }

    /// Comparators of the sortable columns, in declaration order
    pub fn comparators(&self) -> Vec<(String, Compare<T>)> {
        self.entries
            .iter()
            .filter(|(_, c)| c.sortable)
            .filter_map(|(f, c)| c.compare.clone().map(|cmp| (f.clone(), cmp)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
