//! Filter query used by the CLI: free text over every cell, plus a numeric
//! range over one column.
//!
//! URL parameters: `q` (text) and `range` (`min,max`, either side optional).

use plugtable_core::{parse, RecordField};
use plugtable_io::Record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowQuery {
    pub q: Option<String>,
    pub range: (Option<f64>, Option<f64>),
}

impl RowQuery {
    pub fn fields() -> Vec<RecordField<RowQuery>> {
        vec![
            RecordField::new(
                "q",
                |query: &RowQuery| query.q.clone(),
                |query: &mut RowQuery, value| query.q = value,
                parse::optional::<String>,
            ),
            RecordField::new(
                "range",
                |query: &RowQuery| query.range,
                |query: &mut RowQuery, value| query.range = value,
                parse::pair::<f64>,
            ),
        ]
    }

    /// Row predicate. Without a range column the range is ignored; with one,
    /// a bounded range only keeps rows whose cell is a number inside it.
    pub fn judge(&self, range_column: Option<usize>) -> impl Fn(&Record) -> bool {
        let needle = self
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let (min, max) = self.range;
        let bounded = min.is_some() || max.is_some();

        move |record: &Record| {
            if let Some(needle) = &needle {
                let hit = record
                    .cells
                    .iter()
                    .any(|cell| cell.to_string().to_lowercase().contains(needle.as_str()));
                if !hit {
                    return false;
                }
            }
            match range_column {
                Some(column) if bounded => match record.cell(column).as_number() {
                    Some(n) => min.map_or(true, |m| m <= n) && max.map_or(true, |m| n <= m),
                    None => false,
                },
                _ => true,
            }
        }
    }
}
