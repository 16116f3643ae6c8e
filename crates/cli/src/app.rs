//! Builds a table over a dataset and applies command-line mutations.

use std::rc::Rc;

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use plugtable_config::{Settings, SortDirection};
use plugtable_core::{Location, MemoryLocation, QueryString};
use plugtable_engine::plugins::{Direction, FilterPlugin, PagePlugin, SortPlugin, PAGE_STAGE};
use plugtable_engine::{Plugin, Table, TransformReport};
use plugtable_io::{Dataset, Record};
use serde_json::Value;
use thiserror::Error;

use crate::row_query::RowQuery;

/// Bad command-line input, as opposed to a failure while running
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct TableOptions {
    /// Replaces the query string of `url`
    pub query: Option<String>,
    pub url: Option<String>,
    pub rows_per_page: Option<usize>,
    pub range_column: Option<String>,
    /// `--set` operations, applied in order
    pub sets: Vec<SetOp>,
}

/// One `--set NAME[=JSON]` operation
#[derive(Debug, Clone, PartialEq)]
pub struct SetOp {
    pub name: String,
    pub value: Value,
}

impl SetOp {
    /// `NAME=JSON`; a value that is not JSON is taken as a string, a missing one is null
    pub fn parse(raw: &str) -> Result<Self> {
        let (name, value) = match raw.split_once('=') {
            Some((name, value)) => {
                let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
                (name, value)
            }
            None => (raw, Value::Null),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(UsageError(format!("--set needs a name, got `{}`", raw)).into());
        }
        Ok(Self {
            name: name.to_string(),
            value,
        })
    }
}

pub struct Session {
    pub table: Table<Record>,
    pub location: Rc<MemoryLocation>,
    pub headers: Vec<String>,
}

impl Session {
    pub fn build(dataset: Dataset, settings: &Settings, options: &TableOptions) -> Result<Self> {
        let href = options.url.as_deref().unwrap_or(&settings.url_base);
        let location = MemoryLocation::new(href).map_err(|e| UsageError(format!("invalid URL `{}`: {}", href, e)))?;
        let location = Rc::new(location);
        if let Some(query) = &options.query {
            location.replace_query(&QueryString::parse(query));
        }

        let range_column = match &options.range_column {
            Some(name) => match dataset.column_index(name) {
                Some(index) => Some(index),
                None => {
                    return Err(UsageError(format!(
                        "unknown range column `{}` (columns: {})",
                        name,
                        dataset.headers.join(", ")
                    ))
                    .into())
                }
            },
            None => None,
        };

        let shared: Rc<dyn Location> = location.clone();
        let plugins: Vec<Box<dyn Plugin<Record>>> = vec![
            Box::new(sort_plugin(&dataset, settings, shared.clone())?),
            Box::new(
                FilterPlugin::new(
                    move |query: &RowQuery| query.judge(range_column),
                    RowQuery::fields(),
                    RowQuery::default(),
                    shared.clone(),
                )
                .priority(settings.filter_priority),
            ),
            Box::new(PagePlugin::new(
                options.rows_per_page.unwrap_or(settings.rows_per_page),
                shared,
            )?),
        ];

        let headers = dataset.headers;
        let table = Table::build(dataset.rows, plugins)?;
        debug!("chain: {}", table.chain_keys().join(" -> "));

        let mut session = Self {
            table,
            location,
            headers,
        };
        for op in &options.sets {
            session.apply(op)?;
        }
        Ok(session)
    }

    /// Dispatch a mutator, or write a state cell when no mutator has that name
    pub fn apply(&mut self, op: &SetOp) -> Result<Option<TransformReport>> {
        let is_mutator = self.table.mutators().iter().any(|m| m.name == op.name);
        let report = if is_mutator {
            self.table.dispatch(&op.name, op.value.clone())
        } else {
            self.table.set_state(&op.name, op.value.clone())
        }
        .with_context(|| format!("--set {}", op.name))?;

        if let Some(report) = &report {
            debug!("{}", report.log_line());
        }
        Ok(report)
    }

    pub fn href(&self) -> String {
        self.location.href()
    }

    /// `page 2 of 3 | 25 rows | sort power desc`
    pub fn status_line(&self) -> String {
        let number = |name: &str| self.table.state_value(name).and_then(|v| v.as_u64()).unwrap_or(0);
        let text = |name: &str| {
            self.table
                .state_value(name)
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        };
        // Rows entering the page stage
        let matching = self
            .table
            .chain_keys()
            .iter()
            .position(|key| *key == PAGE_STAGE)
            .and_then(|index| self.table.cache().peek(index))
            .map_or(0, |rows| rows.len());
        format!(
            "page {} of {} | {} rows | sort {} {}",
            number("page"),
            number("lastPage"),
            matching,
            text("sort"),
            text("direction"),
        )
    }
}

fn sort_plugin(dataset: &Dataset, settings: &Settings, location: Rc<dyn Location>) -> Result<SortPlugin<Record>> {
    let columns = dataset.columns();
    if columns.is_empty() {
        bail!("the data file has no columns");
    }

    let direction = match settings.sort_direction {
        SortDirection::Asc => Direction::Asc,
        SortDirection::Desc => Direction::Desc,
    };
    let field = match &settings.sort_field {
        Some(field) if columns.get(field).is_some() => field.clone(),
        Some(field) => {
            warn!("settings: sort.field `{}` is not a column, using `{}`", field, dataset.headers[0]);
            dataset.headers[0].clone()
        }
        None => dataset.headers[0].clone(),
    };

    Ok(SortPlugin::from_columns(&columns)
        .fallback(field, direction)
        .build(location)?)
}
