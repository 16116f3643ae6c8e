//! Core types shared by the table engine and its plugins.
//!
//! - **codec**: encodable values and their URL-safe string form
//! - **parse**: "parse-or-fail" helpers for query parameters
//! - **query**: ordered query-string model
//! - **location**: the host's "read query / replace query" boundary
//! - **state_url**: single-field URL-backed state
//! - **record_url**: multi-field URL-backed state with per-field diffing

pub mod codec;
pub mod location;
pub mod parse;
pub mod query;
pub mod record_url;
pub mod state_url;

pub use codec::{encodable_equals, encode, Encodable, ToEncodable};
pub use location::{Location, MemoryLocation};
pub use parse::ParseError;
pub use query::QueryString;
pub use record_url::{RecordField, RecordUrl};
pub use state_url::{FieldConfig, StateUrl};
