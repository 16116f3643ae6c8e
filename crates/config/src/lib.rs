// Configuration loading

pub mod settings;

pub use settings::{ConfigError, LogLevel, Settings, SortDirection};
