//! Records and datasets.

use std::path::Path;

use plugtable_engine::{Column, Columns};

use crate::cell::Cell;
use crate::error::IoError;

static BLANK: Cell = Cell::Blank;

/// One row. `id` is the row's position in the source file and breaks sort ties.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: usize,
    pub cells: Vec<Cell>,
}

impl Record {
    pub fn new(id: usize, cells: Vec<Cell>) -> Self {
        Self { id, cells }
    }

    /// Cell at `column`, blank when out of range
    pub fn cell(&self, column: usize) -> &Cell {
        self.cells.get(column).unwrap_or(&BLANK)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Record>) -> Self {
        Self { headers, rows }
    }

    /// Load by extension: `.json` as JSON, anything else as delimited text
    pub fn load(path: &Path) -> Result<Self, IoError> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let dataset = if is_json {
            crate::json::import(path)?
        } else {
            crate::csv::import(path)?
        };
        log::info!(
            "loaded {} rows x {} columns from {}",
            dataset.rows.len(),
            dataset.headers.len(),
            path.display()
        );
        Ok(dataset)
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// One sortable column per header, ordered by cell then by record id
    pub fn columns(&self) -> Columns<Record> {
        let mut columns = Columns::new();
        for (index, header) in self.headers.iter().enumerate() {
            columns.insert(
                header.clone(),
                Column::sortable(header.clone(), move |a: &Record, b: &Record| {
                    a.cell(index).compare(b.cell(index)).then(a.id.cmp(&b.id))
                }),
            );
        }
        columns
    }
}
