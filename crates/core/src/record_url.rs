//! Record-shaped URL-backed state.
//!
//! A record (e.g. a filter query with several fields) maps to one query
//! parameter per field. Only fields whose encoded form changed are written.

use std::rc::Rc;

use log::debug;

use crate::codec::{encodable_equals, Encodable, ToEncodable};
use crate::location::Location;
use crate::parse::ParseError;
use crate::state_url::rewrite;

type ReadFn<Q> = Box<dyn Fn(&Q) -> Encodable>;
type WriteFn<Q> = Box<dyn Fn(&mut Q, Option<&str>) -> Result<(), ParseError>>;

/// One field of a record and its query parameter
pub struct RecordField<Q> {
    id: String,
    key: Option<String>,
    read: ReadFn<Q>,
    write: WriteFn<Q>,
}

impl<Q: 'static> RecordField<Q> {
    /// `get` reads the field, `set` stores a parsed value, `parse` reads the parameter
    pub fn new<V, G, S, P>(id: impl Into<String>, get: G, set: S, parse: P) -> Self
    where
        V: ToEncodable,
        G: Fn(&Q) -> V + 'static,
        S: Fn(&mut Q, V) + 'static,
        P: Fn(Option<&str>) -> Result<V, ParseError> + 'static,
    {
        Self {
            id: id.into(),
            key: None,
            read: Box::new(move |record| get(record).to_encodable()),
            write: Box::new(move |record, raw| {
                let value = parse(raw)?;
                set(record, value);
                Ok(())
            }),
        }
    }

    /// Use a parameter name other than the field id
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl<Q> RecordField<Q> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Query parameter name (the key override, else the field id)
    pub fn url_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.id)
    }
}

/// Write handle for a record spread over several query parameters
pub struct RecordUrl<Q> {
    fields: Vec<RecordField<Q>>,
    location: Rc<dyn Location>,
}

impl<Q: Clone> RecordUrl<Q> {
    /// Parse the record, starting from `fallback` and overwriting each field
    /// whose parameter parses. Fields that fail keep their fallback value.
    pub fn open(fields: Vec<RecordField<Q>>, fallback: Q, location: Rc<dyn Location>) -> (Self, Q) {
        let query = location.query();
        let mut record = fallback;
        for field in &fields {
            let mut candidate = record.clone();
            match (field.write)(&mut candidate, query.get(field.url_key())) {
                Ok(()) => record = candidate,
                Err(e) => debug!(
                    "query parameter `{}` unusable ({}), keeping fallback",
                    field.url_key(),
                    e
                ),
            }
        }
        (Self { fields, location }, record)
    }

    /// Parameter names of the fields that differ between `old` and `new`
    pub fn changed_keys(&self, old: &Q, new: &Q) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| !encodable_equals(&(f.read)(old), &(f.read)(new)))
            .map(|f| f.url_key())
            .collect()
    }

    /// Write every changed field in one replacement. Returns the number of
    /// fields written; zero means the location was not touched.
    pub fn update(&self, old: &Q, new: &Q) -> usize {
        let changed: Vec<(&str, Encodable)> = self
            .fields
            .iter()
            .filter_map(|f| {
                let (before, after) = ((f.read)(old), (f.read)(new));
                (!encodable_equals(&before, &after)).then(|| (f.url_key(), after))
            })
            .collect();

        if changed.is_empty() {
            return 0;
        }
        let fields: Vec<(&str, &Encodable)> = changed.iter().map(|(k, v)| (*k, v)).collect();
        rewrite(&*self.location, &fields);
        changed.len()
    }
}
