//! Stage declarations and chain ordering.

use serde::Serialize;

/// A stage a plugin contributes to the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDecl {
    pub key: String,
    /// Lower runs earlier; `None` runs after every prioritized stage
    pub priority: Option<i64>,
}

impl StageDecl {
    pub fn new(key: impl Into<String>, priority: Option<i64>) -> Self {
        Self {
            key: key.into(),
            priority,
        }
    }
}

/// A stage placed in the chain, with the index of the plugin that runs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStage {
    pub key: String,
    pub priority: Option<i64>,
    pub plugin: usize,
}

/// Order stages by ascending priority; ties keep declaration order.
///
/// `decls` yields `(plugin index, declaration)` in registration order.
pub fn build_chain(decls: impl IntoIterator<Item = (usize, StageDecl)>) -> Vec<ChainStage> {
    let mut chain: Vec<ChainStage> = decls
        .into_iter()
        .map(|(plugin, decl)| ChainStage {
            key: decl.key,
            priority: decl.priority,
            plugin,
        })
        .collect();
    // Stable: equal keys keep registration order
    chain.sort_by_key(|stage| (stage.priority.is_none(), stage.priority.unwrap_or(0)));
    chain
}
