//! Composable table engine.
//!
//! Plugins contribute priority-ordered stages over a row sequence, plus state,
//! mutators and metadata. [`Table`] runs the chain, caches every intermediate
//! result and recomputes only from the stage a mutation invalidates.

pub mod cache;
pub mod columns;
pub mod error;
pub mod plugin;
pub mod plugins;
pub mod report;
pub mod stage;
pub mod table;

pub use cache::StageCache;
pub use columns::{Column, Columns, Compare};
pub use error::{EngineError, PluginError};
pub use plugin::{Mutator, Plugin, StateCell};
pub use report::TransformReport;
pub use stage::{ChainStage, StageDecl};
pub use table::Table;
