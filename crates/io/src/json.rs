// JSON import/export
//
// Accepted layouts:
// - array of objects: headers are the keys in first-seen order
// - array of arrays: the first array holds the headers

use std::io::Write;
use std::path::Path;

use serde_json::{Map, Value};

use crate::cell::Cell;
use crate::csv::read_file_as_utf8;
use crate::dataset::{Dataset, Record};
use crate::error::IoError;

pub fn import(path: &Path) -> Result<Dataset, IoError> {
    let content = read_file_as_utf8(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<Dataset, IoError> {
    let value: Value = serde_json::from_str(content)?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(IoError::Layout(format!(
                "expected a top-level array, found {}",
                kind(&other)
            )))
        }
    };

    match items.first() {
        None => Ok(Dataset::default()),
        Some(Value::Object(_)) => from_objects(items),
        Some(Value::Array(_)) => from_arrays(items),
        Some(other) => Err(IoError::Layout(format!(
            "rows must be objects or arrays, found {}",
            kind(other)
        ))),
    }
}

fn from_objects(items: Vec<Value>) -> Result<Dataset, IoError> {
    let mut headers: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(IoError::Layout(format!("row {} is not an object", i)));
        };
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push(map);
    }

    let rows = objects
        .iter()
        .enumerate()
        .map(|(id, map)| {
            let cells = headers
                .iter()
                .map(|h| map.get(h).map_or(Cell::Blank, Cell::from_json))
                .collect();
            Record::new(id, cells)
        })
        .collect();
    Ok(Dataset::new(headers, rows))
}

fn from_arrays(items: Vec<Value>) -> Result<Dataset, IoError> {
    let mut arrays = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let Value::Array(values) = item else {
            return Err(IoError::Layout(format!("row {} is not an array", i)));
        };
        arrays.push(values);
    }

    let mut arrays = arrays.into_iter();
    let headers: Vec<String> = arrays
        .next()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Null => format!("column{}", i + 1),
            other => other.to_string(),
        })
        .collect();

    let rows = arrays
        .enumerate()
        .map(|(id, values)| {
            let mut cells: Vec<Cell> = values.iter().map(Cell::from_json).collect();
            cells.resize(headers.len(), Cell::Blank);
            Record::new(id, cells)
        })
        .collect();
    Ok(Dataset::new(headers, rows))
}

/// Write rows as a pretty JSON array of objects keyed by header
pub fn write<W: Write>(headers: &[String], rows: &[Record], out: W) -> Result<(), IoError> {
    let objects: Vec<Value> = rows.iter().map(|row| row_object(headers, row)).collect();
    serde_json::to_writer_pretty(out, &objects)?;
    Ok(())
}

pub fn row_object(headers: &[String], row: &Record) -> Value {
    let mut map = Map::new();
    for (header, cell) in headers.iter().zip(&row.cells) {
        map.insert(header.clone(), cell.to_json());
    }
    Value::Object(map)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
