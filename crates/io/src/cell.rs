//! Typed cells inferred from raw text.
//!
//! Ordering follows the typed-rank rule: numbers < text < bool < blank, so
//! blanks always sink to the bottom of an ascending sort. Text compares
//! trimmed and lowercased.

use std::cmp::Ordering;
use std::fmt;

use ordered_float::OrderedFloat;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Blank,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Infer a cell from a raw CSV field
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Blank;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Cell::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Cell::Bool(false);
        }
        match trimmed.parse::<f64>() {
            // "inf" and "NaN" parse as floats but stay text
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(raw.to_string()),
        }
    }

    /// Convert a JSON scalar; nested arrays and objects are kept as their JSON text
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Blank,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Cell::Blank, Cell::Number),
            Value::String(s) if s.trim().is_empty() => Cell::Blank,
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Blank => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Blank)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn key(&self) -> CellKey {
        let (type_rank, value) = match self {
            Cell::Number(n) => (0, NormalizedCell::Number(OrderedFloat(*n))),
            Cell::Text(s) => (1, NormalizedCell::Text(s.trim().to_lowercase())),
            Cell::Bool(b) => (2, NormalizedCell::Bool(*b)),
            Cell::Blank => (3, NormalizedCell::Blank),
        };
        CellKey { type_rank, value }
    }

    pub fn compare(&self, other: &Cell) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Blank => Ok(()),
            Cell::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Comparison key for a cell
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CellKey {
    /// Numbers(0) < Text(1) < Bool(2) < Blank(3)
    pub type_rank: u8,
    pub value: NormalizedCell,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NormalizedCell {
    Blank,
    Bool(bool),
    Number(OrderedFloat<f64>),
    /// Trimmed + lowercase
    Text(String),
}
