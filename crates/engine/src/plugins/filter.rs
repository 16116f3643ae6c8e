//! Filter plugin
//!
//! Keeps rows accepted by a predicate built from the current query. The query
//! is a record spread over several URL parameters; the predicate factory is
//! supplied by the host and called each time the stage runs.

use std::rc::Rc;

use plugtable_core::{Location, RecordField, RecordUrl};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::PluginError;
use crate::plugin::{arg, snapshot, Mutator, Plugin, StateCell};
use crate::stage::StageDecl;

pub const FILTER_STAGE: &str = "tfFilter";

/// Default priority: ahead of the sort stage
pub const DEFAULT_PRIORITY: i64 = -1;

type Predicate<T> = Box<dyn Fn(&T) -> bool>;
type JudgeFactory<T, Q> = Box<dyn Fn(&Q) -> Predicate<T>>;

pub struct FilterPlugin<T, Q> {
    judge: JudgeFactory<T, Q>,
    query: Q,
    fallback: Q,
    url: RecordUrl<Q>,
    priority: i64,
}

impl<T, Q> FilterPlugin<T, Q>
where
    T: Clone + 'static,
    Q: Clone + Serialize + DeserializeOwned + 'static,
{
    /// `judge` turns a query into a row predicate; `fields` map the query to URL parameters
    pub fn new<F, P>(judge: F, fields: Vec<RecordField<Q>>, fallback: Q, location: Rc<dyn Location>) -> Self
    where
        F: Fn(&Q) -> P + 'static,
        P: Fn(&T) -> bool + 'static,
    {
        let (url, query) = RecordUrl::open(fields, fallback.clone(), location);
        Self {
            judge: Box::new(move |query: &Q| -> Predicate<T> { Box::new(judge(query)) }),
            query,
            fallback,
            url,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Replace the whole query, rewriting only the URL parameters that changed
    pub fn set_query(&mut self, query: Q) {
        self.url.update(&self.query, &query);
        self.query = query;
    }

    pub fn reset_query(&mut self) {
        self.set_query(self.fallback.clone());
    }
}

impl<T, Q> Plugin<T> for FilterPlugin<T, Q>
where
    T: Clone + 'static,
    Q: Clone + Serialize + DeserializeOwned + 'static,
{
    fn name(&self) -> &str {
        "filter"
    }

    fn stages(&self) -> Vec<StageDecl> {
        vec![StageDecl::new(FILTER_STAGE, Some(self.priority))]
    }

    fn run_stage(&mut self, key: &str, rows: &[T]) -> Result<Vec<T>, PluginError> {
        if key != FILTER_STAGE {
            return Err(PluginError::UnknownStage(key.to_string()));
        }
        let keep = (self.judge)(&self.query);
        Ok(rows.iter().filter(|row| keep(row)).cloned().collect())
    }

    fn state(&self) -> Vec<(String, StateCell)> {
        vec![("query".into(), StateCell::writable(snapshot(&self.query), FILTER_STAGE))]
    }

    fn set_state(&mut self, name: &str, value: Value) -> Result<(), PluginError> {
        match name {
            "query" => {
                self.set_query(arg(name, value)?);
                Ok(())
            }
            _ => Err(PluginError::UnknownState(name.to_string())),
        }
    }

    fn mutators(&self) -> Vec<Mutator> {
        vec![
            Mutator::new("setQuery", Some(FILTER_STAGE)),
            Mutator::new("resetQuery", Some(FILTER_STAGE)),
        ]
    }

    fn apply(&mut self, name: &str, value: Value) -> Result<(), PluginError> {
        match name {
            "setQuery" => self.set_query(arg(name, value)?),
            "resetQuery" => self.reset_query(),
            _ => return Err(PluginError::UnknownMutator(name.to_string())),
        }
        Ok(())
    }
}
