//! Single-field URL-backed state.
//!
//! The field's value is parsed once from the query string when the owning
//! plugin is constructed. After that, each setter call hands the old and new
//! values to [`StateUrl::update`], which rewrites the parameter only when the
//! encoded form actually changed.

use std::marker::PhantomData;
use std::rc::Rc;

use log::debug;

use crate::codec::{encodable_equals, encode, Encodable, ToEncodable};
use crate::location::Location;
use crate::parse::ParseError;

pub type ParseFn<V> = Box<dyn Fn(Option<&str>) -> Result<V, ParseError>>;

/// How one query parameter maps to a typed value
pub struct FieldConfig<V> {
    pub key: String,
    pub parse: ParseFn<V>,
    pub fallback: V,
}

impl<V> FieldConfig<V> {
    pub fn new<P>(key: impl Into<String>, parse: P, fallback: V) -> Self
    where
        P: Fn(Option<&str>) -> Result<V, ParseError> + 'static,
    {
        Self {
            key: key.into(),
            parse: Box::new(parse),
            fallback,
        }
    }

    /// Read the field from a raw parameter, falling back on any failure
    pub fn resolve(&self, raw: Option<&str>) -> V
    where
        V: Clone,
    {
        match (self.parse)(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("query parameter `{}` unusable ({}), using fallback", self.key, e);
                self.fallback.clone()
            }
        }
    }
}

/// Write handle for one query parameter
pub struct StateUrl<V> {
    key: String,
    location: Rc<dyn Location>,
    _value: PhantomData<fn(&V)>,
}

impl<V: ToEncodable + Clone> StateUrl<V> {
    /// Parse the current value and return it with the write handle
    pub fn open(config: FieldConfig<V>, location: Rc<dyn Location>) -> (Self, V) {
        let query = location.query();
        let value = config.resolve(query.get(&config.key));
        let handle = Self {
            key: config.key,
            location,
            _value: PhantomData,
        };
        (handle, value)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rewrite the parameter if `new` differs from `old`.
    ///
    /// Returns true when the location was replaced.
    pub fn update(&self, old: &V, new: &V) -> bool {
        let (old, new) = (old.to_encodable(), new.to_encodable());
        if encodable_equals(&old, &new) {
            return false;
        }
        rewrite(&*self.location, &[(self.key.as_str(), &new)]);
        true
    }
}

/// Apply changed fields to the current query string and replace it.
///
/// Values without a URL form (null, empty) remove their parameter; all other
/// parameters are left untouched.
pub(crate) fn rewrite(location: &dyn Location, fields: &[(&str, &Encodable)]) {
    let mut query = location.query();
    for (key, value) in fields {
        match encode(value) {
            Some(encoded) if !encoded.is_empty() => query.set(key, encoded),
            _ => query.remove(key),
        }
    }
    debug!("replacing query string: {}", query);
    location.replace_query(&query);
}
