//! Plugin contract.
//!
//! A plugin contributes four namespaces to the table:
//! - **transformer**: stages, each a pure row transform
//! - **state**: named cells with a JSON snapshot of the value
//! - **dispatch**: named mutators, each optionally tagged with the stage it invalidates
//! - **misc**: read-only metadata
//!
//! Plugins own their mutable state. The table only reads snapshots and routes
//! mutations; after a mutation it recomputes from the stage the plugin named.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::PluginError;
use crate::stage::StageDecl;

/// Snapshot of one exported state cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateCell {
    pub value: Value,
    /// Whether the table accepts `set_state` for this cell
    pub writable: bool,
    /// Stage to recompute from after a write
    pub invalidates: Option<String>,
}

impl StateCell {
    /// Writable cell that invalidates `stage`
    pub fn writable(value: Value, stage: &str) -> Self {
        Self {
            value,
            writable: true,
            invalidates: Some(stage.to_string()),
        }
    }

    /// Derived, read-only cell
    pub fn read_only(value: Value) -> Self {
        Self {
            value,
            writable: false,
            invalidates: None,
        }
    }
}

/// An exported mutator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mutator {
    pub name: String,
    pub invalidates: Option<String>,
}

impl Mutator {
    pub fn new(name: &str, invalidates: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            invalidates: invalidates.map(str::to_string),
        }
    }
}

pub trait Plugin<T> {
    /// Name used in diagnostics and collision reports
    fn name(&self) -> &str;

    fn stages(&self) -> Vec<StageDecl>;

    /// Run stage `key` over `rows`, returning a new sequence
    fn run_stage(&mut self, key: &str, rows: &[T]) -> Result<Vec<T>, PluginError>;

    fn state(&self) -> Vec<(String, StateCell)>;

    /// Write a writable state cell. The table recomputes afterwards.
    fn set_state(&mut self, name: &str, value: Value) -> Result<(), PluginError>;

    fn mutators(&self) -> Vec<Mutator>;

    /// Invoke mutator `name`. The table recomputes afterwards if it declares a stage.
    fn apply(&mut self, name: &str, arg: Value) -> Result<(), PluginError>;

    fn misc(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

/// Deserialize a mutator argument
pub fn arg<A: DeserializeOwned>(name: &str, value: Value) -> Result<A, PluginError> {
    serde_json::from_value(value).map_err(|e| PluginError::invalid_argument(name, e.to_string()))
}

/// Serialize a state value for a snapshot
pub fn snapshot<V: Serialize>(value: &V) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arg_deserializes() {
        let page: usize = arg("setPage", json!(3)).unwrap();
        assert_eq!(page, 3);
    }

    #[test]
    fn test_arg_rejects_wrong_type() {
        let err = arg::<usize>("setPage", json!("three")).unwrap_err();
        assert!(matches!(err, PluginError::InvalidArgument { ref name, .. } if name == "setPage"));
    }
}
