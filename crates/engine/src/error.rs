//! Engine and plugin errors.

use thiserror::Error;

/// Errors raised by a plugin while running a stage or applying a mutation
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown stage `{0}`")]
    UnknownStage(String),

    #[error("unknown mutator `{0}`")]
    UnknownMutator(String),

    #[error("unknown state `{0}`")]
    UnknownState(String),

    #[error("invalid argument for `{name}`: {message}")]
    InvalidArgument { name: String, message: String },

    /// Plugin could not be constructed from its configuration
    #[error("invalid plugin configuration: {0}")]
    Config(String),

    /// A stage failed while transforming rows
    #[error("{0}")]
    Failed(String),
}

impl PluginError {
    pub fn invalid_argument(name: &str, message: impl Into<String>) -> Self {
        PluginError::InvalidArgument {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The stage cache was used before it held any row sequence
    #[error("stage cache is empty")]
    CacheUninitialized,

    #[error("duplicate {namespace} key `{key}` exported by `{first}` and `{second}`")]
    DuplicateKey {
        namespace: &'static str,
        key: String,
        first: String,
        second: String,
    },

    #[error("no plugin exports mutator `{0}`")]
    UnknownMutator(String),

    #[error("no plugin exports state `{0}`")]
    UnknownState(String),

    #[error("state `{0}` is read-only")]
    ReadOnlyState(String),

    #[error("stage `{key}` failed: {source}")]
    Stage {
        key: String,
        #[source]
        source: PluginError,
    },

    #[error("plugin `{plugin}`: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: PluginError,
    },
}
