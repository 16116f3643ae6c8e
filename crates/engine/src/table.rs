//! Pipeline engine.
//!
//! `Table` owns the plugins, the priority-ordered stage chain and the stage
//! cache. It is the single entry point for recomputation:
//! - `tf(key)` recomputes from stage `key` (or the start) and publishes
//! - `dispatch(name, arg)` and `set_state(name, value)` route a mutation to its
//!   plugin, then call `tf` with the stage the mutation invalidates
//!
//! Key invariants:
//! - Namespace keys are unique across plugins (checked at build)
//! - A failed transform never publishes; the previous table and revision stay
//! - `revision` increases by one per published transform

use std::time::Instant;

use log::{debug, trace};
use rustc_hash::FxHashMap;
use serde_json::{json, Value};

use crate::cache::StageCache;
use crate::error::EngineError;
use crate::plugin::{Mutator, Plugin, StateCell};
use crate::report::TransformReport;
use crate::stage::{build_chain, ChainStage};

/// Key ownership per namespace, resolved once at build
#[derive(Debug, Default)]
struct Routes {
    state: FxHashMap<String, usize>,
    dispatch: FxHashMap<String, (usize, Option<String>)>,
}

/// Result of running part of the chain
struct ChainRun<T> {
    rows: Vec<T>,
    start_index: usize,
    stages_run: usize,
    rows_in: usize,
}

pub struct Table<T> {
    plugins: Vec<Box<dyn Plugin<T>>>,
    names: Vec<String>,
    chain: Vec<ChainStage>,
    routes: Routes,
    cache: StageCache<T>,
    table: Vec<T>,
    revision: u64,
    /// Chain index of a stage that failed; cache entries after it are stale
    stale_from: Option<usize>,
}

impl<T: Clone> Table<T> {
    /// Build the chain, run the initial full transform and publish it
    pub fn build(rows: Vec<T>, plugins: Vec<Box<dyn Plugin<T>>>) -> Result<Self, EngineError> {
        let names: Vec<String> = plugins.iter().map(|p| p.name().to_string()).collect();

        let mut transformer: FxHashMap<String, usize> = FxHashMap::default();
        let mut dispatch: FxHashMap<String, usize> = FxHashMap::default();
        let mut misc: FxHashMap<String, usize> = FxHashMap::default();
        let mut routes = Routes::default();
        let mut decls = Vec::new();

        for (index, plugin) in plugins.iter().enumerate() {
            for decl in plugin.stages() {
                claim(&mut transformer, "transformer", &decl.key, index, &names)?;
                decls.push((index, decl));
            }
            for (key, _) in plugin.state() {
                claim(&mut routes.state, "state", &key, index, &names)?;
            }
            for mutator in plugin.mutators() {
                claim(&mut dispatch, "dispatch", &mutator.name, index, &names)?;
                routes.dispatch.insert(mutator.name, (index, mutator.invalidates));
            }
            for (key, _) in plugin.misc() {
                claim(&mut misc, "misc", &key, index, &names)?;
            }
        }

        let chain = build_chain(decls);
        debug!(
            "building table: {} rows, {} plugins, chain [{}]",
            rows.len(),
            plugins.len(),
            chain.iter().map(|s| s.key.as_str()).collect::<Vec<_>>().join(", ")
        );

        let mut table = Self {
            plugins,
            names,
            chain,
            routes,
            cache: StageCache::new(rows),
            table: Vec::new(),
            revision: 0,
            stale_from: None,
        };
        table.tf(None)?;
        Ok(table)
    }

    // -------------------------------------------------------------------------
    // Recomputation
    // -------------------------------------------------------------------------

    /// Recompute from stage `key` (unknown or `None` = start of chain) without publishing
    pub fn calc_from(&mut self, key: Option<&str>) -> Result<Vec<T>, EngineError> {
        self.run_chain(key).map(|run| run.rows)
    }

    /// Recompute from stage `key` and publish the result
    pub fn tf(&mut self, key: Option<&str>) -> Result<TransformReport, EngineError> {
        let started = Instant::now();
        let run = self.run_chain(key)?;

        self.table = run.rows;
        self.revision += 1;

        let report = TransformReport {
            from_key: key.map(str::to_string),
            start_index: run.start_index,
            stages_run: run.stages_run,
            rows_in: run.rows_in,
            rows_out: self.table.len(),
            duration: started.elapsed(),
            revision: self.revision,
        };
        debug!("{}", report.log_line());
        Ok(report)
    }

    fn run_chain(&mut self, key: Option<&str>) -> Result<ChainRun<T>, EngineError> {
        let requested = key
            .and_then(|k| self.chain.iter().position(|stage| stage.key == k))
            .unwrap_or(0);
        let start = match self.stale_from {
            Some(stale) => requested.min(stale),
            None => requested,
        };

        let mut rows = self.cache.get(start)?;
        let rows_in = rows.len();

        for (offset, stage) in self.chain[start..].iter().enumerate() {
            let index = start + offset;
            if offset != 0 {
                self.cache.set(index, rows.clone())?;
            }

            let started = Instant::now();
            rows = match self.plugins[stage.plugin].run_stage(&stage.key, &rows) {
                Ok(next) => next,
                Err(source) => {
                    self.stale_from = Some(index);
                    return Err(EngineError::Stage {
                        key: stage.key.clone(),
                        source,
                    });
                }
            };
            trace!(
                "stage #{} {} ({}): {} rows in {:?}",
                index,
                stage.key,
                self.names[stage.plugin],
                rows.len(),
                started.elapsed()
            );
        }

        self.cache.set(self.chain.len(), rows.clone())?;
        self.stale_from = None;

        Ok(ChainRun {
            rows,
            start_index: start,
            stages_run: self.chain.len() - start,
            rows_in,
        })
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Invoke a mutator, then recompute from the stage it invalidates.
    ///
    /// Returns `None` for mutators that declare no stage.
    pub fn dispatch(&mut self, name: &str, arg: Value) -> Result<Option<TransformReport>, EngineError> {
        let (plugin, invalidates) = self
            .routes
            .dispatch
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownMutator(name.to_string()))?;

        debug!("dispatch {} -> {}", name, self.names[plugin]);
        self.plugins[plugin]
            .apply(name, arg)
            .map_err(|source| EngineError::Plugin {
                plugin: self.names[plugin].clone(),
                source,
            })?;

        match invalidates {
            Some(stage) => self.tf(Some(&stage)).map(Some),
            None => Ok(None),
        }
    }

    /// Write a state cell through its plugin, then recompute from the stage it invalidates
    pub fn set_state(&mut self, name: &str, value: Value) -> Result<Option<TransformReport>, EngineError> {
        let plugin = *self
            .routes
            .state
            .get(name)
            .ok_or_else(|| EngineError::UnknownState(name.to_string()))?;
        let cell = self.plugins[plugin]
            .state()
            .into_iter()
            .find_map(|(key, cell)| (key == name).then_some(cell))
            .ok_or_else(|| EngineError::UnknownState(name.to_string()))?;
        if !cell.writable {
            return Err(EngineError::ReadOnlyState(name.to_string()));
        }

        self.plugins[plugin]
            .set_state(name, value)
            .map_err(|source| EngineError::Plugin {
                plugin: self.names[plugin].clone(),
                source,
            })?;

        match cell.invalidates {
            Some(stage) => self.tf(Some(&stage)).map(Some),
            None => Ok(None),
        }
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    /// The published row sequence
    pub fn table(&self) -> &[T] {
        &self.table
    }

    /// Merged state cells in registration order
    pub fn state(&self) -> Vec<(String, StateCell)> {
        self.plugins.iter().flat_map(|p| p.state()).collect()
    }

    pub fn state_value(&self, name: &str) -> Option<Value> {
        let plugin = *self.routes.state.get(name)?;
        self.plugins[plugin]
            .state()
            .into_iter()
            .find_map(|(key, cell)| (key == name).then_some(cell.value))
    }

    /// Merged misc entries in registration order
    pub fn misc(&self) -> Vec<(String, Value)> {
        self.plugins.iter().flat_map(|p| p.misc()).collect()
    }

    pub fn misc_value(&self, name: &str) -> Option<Value> {
        self.misc()
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    pub fn mutators(&self) -> Vec<Mutator> {
        self.plugins.iter().flat_map(|p| p.mutators()).collect()
    }

    pub fn chain(&self) -> &[ChainStage] {
        &self.chain
    }

    pub fn chain_keys(&self) -> Vec<&str> {
        self.chain.iter().map(|s| s.key.as_str()).collect()
    }

    pub fn plugin_names(&self) -> &[String] {
        &self.names
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn cache(&self) -> &StageCache<T> {
        &self.cache
    }

    /// All namespaces as one JSON document
    pub fn inspect(&self) -> Value {
        let state: serde_json::Map<String, Value> = self
            .state()
            .into_iter()
            .map(|(key, cell)| (key, json!(cell)))
            .collect();
        let misc: serde_json::Map<String, Value> = self.misc().into_iter().collect();
        json!({
            "revision": self.revision,
            "rows": self.table.len(),
            "chain": self.chain,
            "state": state,
            "dispatch": self.mutators(),
            "misc": misc,
        })
    }
}

/// Record `key` as owned by `plugin`, rejecting a second owner
fn claim(
    seen: &mut FxHashMap<String, usize>,
    namespace: &'static str,
    key: &str,
    plugin: usize,
    names: &[String],
) -> Result<(), EngineError> {
    if let Some(&first) = seen.get(key) {
        return Err(EngineError::DuplicateKey {
            namespace,
            key: key.to_string(),
            first: names[first].clone(),
            second: names[plugin].clone(),
        });
    }
    seen.insert(key.to_string(), plugin);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginError;
    use crate::plugin::arg;
    use crate::stage::StageDecl;
    use std::cell::Cell;
    use std::rc::Rc;

    type StepFn = fn(&[i32], i32) -> Vec<i32>;

    /// One-stage plugin with an integer parameter
    struct Step {
        key: &'static str,
        priority: Option<i64>,
        f: StepFn,
        param: i32,
        runs: Rc<Cell<usize>>,
        fail: bool,
    }

    impl Step {
        fn new(key: &'static str, priority: Option<i64>, f: StepFn, param: i32) -> Self {
            Self {
                key,
                priority,
                f,
                param,
                runs: Rc::new(Cell::new(0)),
                fail: false,
            }
        }
    }

    impl Plugin<i32> for Step {
        fn name(&self) -> &str {
            self.key
        }

        fn stages(&self) -> Vec<StageDecl> {
            vec![StageDecl::new(self.key, self.priority)]
        }

        fn run_stage(&mut self, key: &str, rows: &[i32]) -> Result<Vec<i32>, PluginError> {
            if key != self.key {
                return Err(PluginError::UnknownStage(key.to_string()));
            }
            if self.fail {
                return Err(PluginError::Failed("boom".into()));
            }
            self.runs.set(self.runs.get() + 1);
            Ok((self.f)(rows, self.param))
        }

        fn state(&self) -> Vec<(String, StateCell)> {
            vec![
                (format!("{}Param", self.key), StateCell::writable(json!(self.param), self.key)),
                (format!("{}Runs", self.key), StateCell::read_only(json!(self.runs.get()))),
            ]
        }

        fn set_state(&mut self, name: &str, value: Value) -> Result<(), PluginError> {
            self.param = arg(name, value)?;
            Ok(())
        }

        fn mutators(&self) -> Vec<Mutator> {
            vec![
                Mutator::new(&format!("{}Set", self.key), Some(self.key)),
                Mutator::new(&format!("{}Fail", self.key), None),
            ]
        }

        fn apply(&mut self, name: &str, value: Value) -> Result<(), PluginError> {
            if name.ends_with("Fail") {
                self.fail = arg(name, value)?;
            } else {
                self.param = arg(name, value)?;
            }
            Ok(())
        }

        fn misc(&self) -> Vec<(String, Value)> {
            vec![(format!("{}Priority", self.key), json!(self.priority))]
        }
    }

    fn add(rows: &[i32], n: i32) -> Vec<i32> {
        rows.iter().map(|r| r + n).collect()
    }

    fn mul(rows: &[i32], n: i32) -> Vec<i32> {
        rows.iter().map(|r| r * n).collect()
    }

    fn keep_above(rows: &[i32], n: i32) -> Vec<i32> {
        rows.iter().copied().filter(|r| *r > n).collect()
    }

    fn plugins() -> (Vec<Box<dyn Plugin<i32>>>, [Rc<Cell<usize>>; 3]) {
        // Registered out of priority order on purpose
        let last = Step::new("add", None, add, 1);
        let middle = Step::new("mul", Some(0), mul, 10);
        let first = Step::new("keep", Some(-1), keep_above, 1);
        let runs = [first.runs.clone(), middle.runs.clone(), last.runs.clone()];
        let plugins: Vec<Box<dyn Plugin<i32>>> = vec![Box::new(last), Box::new(middle), Box::new(first)];
        (plugins, runs)
    }

    #[test]
    fn test_build_runs_chain_in_priority_order() {
        let (plugins, _) = plugins();
        let table = Table::build(vec![1, 2, 3], plugins).unwrap();

        assert_eq!(table.chain_keys(), vec!["keep", "mul", "add"]);
        // keep > 1 -> [2, 3]; * 10 -> [20, 30]; + 1 -> [21, 31]
        assert_eq!(table.table(), &[21, 31]);
        assert_eq!(table.revision(), 1);
    }

    #[test]
    fn test_cache_holds_every_stage_result() {
        let (plugins, _) = plugins();
        let table = Table::build(vec![1, 2, 3], plugins).unwrap();
        let cache = table.cache();

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(0).unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.get(1).unwrap(), vec![2, 3]);
        assert_eq!(cache.get(2).unwrap(), vec![20, 30]);
        assert_eq!(cache.get(3).unwrap(), vec![21, 31]);
    }

    #[test]
    fn test_dispatch_recomputes_from_invalidated_stage() {
        let (plugins, [keep_runs, mul_runs, add_runs]) = plugins();
        let mut table = Table::build(vec![1, 2, 3], plugins).unwrap();

        let report = table.dispatch("mulSet", json!(100)).unwrap().unwrap();
        assert_eq!(report.start_index, 1);
        assert_eq!(report.stages_run, 2);
        assert_eq!(table.table(), &[201, 301]);

        assert_eq!(keep_runs.get(), 1);
        assert_eq!(mul_runs.get(), 2);
        assert_eq!(add_runs.get(), 2);
        assert_eq!(table.state_value("mulParam"), Some(json!(100)));
    }

    #[test]
    fn test_tf_is_idempotent() {
        let (plugins, _) = plugins();
        let mut table = Table::build(vec![5, 1, 4], plugins).unwrap();
        let first = table.table().to_vec();

        table.tf(None).unwrap();
        assert_eq!(table.table(), first.as_slice());
        table.tf(Some("add")).unwrap();
        assert_eq!(table.table(), first.as_slice());
        assert_eq!(table.revision(), 3);
    }

    #[test]
    fn test_unknown_key_starts_at_zero() {
        let (plugins, [keep_runs, _, _]) = plugins();
        let mut table = Table::build(vec![1, 2, 3], plugins).unwrap();

        let report = table.tf(Some("nope")).unwrap();
        assert_eq!(report.start_index, 0);
        assert_eq!(keep_runs.get(), 2);
    }

    #[test]
    fn test_metadata_mutator_does_not_recompute() {
        let (plugins, _) = plugins();
        let mut table = Table::build(vec![1, 2, 3], plugins).unwrap();

        assert!(table.dispatch("addFail", json!(false)).unwrap().is_none());
        assert_eq!(table.revision(), 1);
    }

    #[test]
    fn test_stage_error_propagates() {
        let (plugins, _) = plugins();
        let mut table = Table::build(vec![1, 2, 3], plugins).unwrap();
        let before = table.table().to_vec();

        table.dispatch("mulFail", json!(true)).unwrap();
        let err = table.dispatch("mulSet", json!(7)).unwrap_err();
        assert!(matches!(err, EngineError::Stage { ref key, .. } if key == "mul"));
        assert_eq!(table.table(), before.as_slice());
        assert_eq!(table.revision(), 1);

        // A later stage cannot skip past the failed one
        table.dispatch("mulFail", json!(false)).unwrap();
        let report = table.tf(Some("add")).unwrap();
        assert_eq!(report.start_index, 1);
        assert_eq!(table.table(), &[15, 22]);
    }

    #[test]
    fn test_set_state() {
        let (plugins, _) = plugins();
        let mut table = Table::build(vec![1, 2, 3], plugins).unwrap();

        let report = table.set_state("addParam", json!(5)).unwrap().unwrap();
        assert_eq!(report.start_index, 2);
        assert_eq!(table.table(), &[25, 35]);

        assert!(matches!(
            table.set_state("addRuns", json!(0)),
            Err(EngineError::ReadOnlyState(_))
        ));
        assert!(matches!(
            table.set_state("missing", json!(0)),
            Err(EngineError::UnknownState(_))
        ));
    }

    #[test]
    fn test_unknown_mutator() {
        let (plugins, _) = plugins();
        let mut table = Table::build(vec![1], plugins).unwrap();
        assert!(matches!(
            table.dispatch("nope", Value::Null),
            Err(EngineError::UnknownMutator(_))
        ));
    }

    #[test]
    fn test_bad_argument_is_reported_with_plugin() {
        let (plugins, _) = plugins();
        let mut table = Table::build(vec![1], plugins).unwrap();
        let err = table.dispatch("mulSet", json!("ten")).unwrap_err();
        assert!(matches!(err, EngineError::Plugin { ref plugin, .. } if plugin == "mul"));
        assert_eq!(table.revision(), 1);
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let plugins: Vec<Box<dyn Plugin<i32>>> = vec![
            Box::new(Step::new("add", None, add, 1)),
            Box::new(Step::new("add", Some(3), add, 2)),
        ];
        let err = Table::build(vec![1], plugins).err().unwrap();
        assert!(matches!(
            err,
            EngineError::DuplicateKey { namespace: "transformer", ref key, .. } if key == "add"
        ));
    }

    #[test]
    fn test_empty_chain_publishes_input() {
        let table = Table::build(vec![3, 1, 2], Vec::new()).unwrap();
        assert_eq!(table.table(), &[3, 1, 2]);
        assert!(table.chain_keys().is_empty());
    }

    #[test]
    fn test_inspect() {
        let (plugins, _) = plugins();
        let table = Table::build(vec![1, 2, 3], plugins).unwrap();
        let doc = table.inspect();

        assert_eq!(doc["rows"], json!(2));
        assert_eq!(doc["chain"][0]["key"], json!("keep"));
        assert_eq!(doc["state"]["mulParam"]["value"], json!(10));
        assert_eq!(doc["state"]["mulParam"]["invalidates"], json!("mul"));
        assert_eq!(doc["misc"]["addPriority"], Value::Null);
    }
}
