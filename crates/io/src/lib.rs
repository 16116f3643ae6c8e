// Row sources: CSV and JSON files loaded into typed records

pub mod cell;
pub mod csv;
pub mod dataset;
pub mod error;
pub mod json;

pub use cell::{Cell, CellKey};
pub use dataset::{Dataset, Record};
pub use error::IoError;
