//! Encodable values.
//!
//! An encodable value is a primitive (null, bool, number, text) or a list of
//! them, with a defined URL string form:
//! - text is percent-encoded
//! - numbers and booleans stringify directly
//! - lists encode element-wise and join with commas
//! - null encodes to nothing (the parameter is omitted)

use std::mem;

use serde::{Deserialize, Serialize};

/// A value with a lossless URL representation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Encodable {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Encodable>),
}

impl Encodable {
    pub fn is_null(&self) -> bool {
        matches!(self, Encodable::Null)
    }

    /// Same variant, ignoring the payload
    pub fn same_kind(&self, other: &Encodable) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    /// Convert from a JSON value. Objects have no URL form and become `Null`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null | serde_json::Value::Object(_) => Encodable::Null,
            serde_json::Value::Bool(b) => Encodable::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Encodable::Null, Encodable::Number),
            serde_json::Value::String(s) => Encodable::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Encodable::List(items.iter().map(Encodable::from_json).collect())
            }
        }
    }

    /// Convert to a JSON value. Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Encodable::Null => serde_json::Value::Null,
            Encodable::Bool(b) => serde_json::Value::Bool(*b),
            Encodable::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Encodable::Text(s) => serde_json::Value::String(s.clone()),
            Encodable::List(items) => {
                serde_json::Value::Array(items.iter().map(Encodable::to_json).collect())
            }
        }
    }
}

/// Encode a value for the URL. Returns `None` for values that are omitted.
pub fn encode(value: &Encodable) -> Option<String> {
    match value {
        Encodable::Null => None,
        Encodable::Bool(b) => Some(b.to_string()),
        Encodable::Number(n) => Some(n.to_string()),
        Encodable::Text(s) => Some(urlencoding::encode(s).into_owned()),
        Encodable::List(items) => Some(
            items
                .iter()
                .map(|item| encode(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
    }
}

/// Equality by encoded form: same variant and same URL string.
///
/// `[1, 2]` and `[1.0, 2.0]` are equal; `"1"` and `1` are not.
pub fn encodable_equals(a: &Encodable, b: &Encodable) -> bool {
    a.same_kind(b) && encode(a) == encode(b)
}

// =============================================================================
// ToEncodable: Rust values -> Encodable
// =============================================================================

/// Conversion into an [`Encodable`]
pub trait ToEncodable {
    fn to_encodable(&self) -> Encodable;
}

impl ToEncodable for Encodable {
    fn to_encodable(&self) -> Encodable {
        self.clone()
    }
}

impl ToEncodable for str {
    fn to_encodable(&self) -> Encodable {
        Encodable::Text(self.to_string())
    }
}

impl ToEncodable for String {
    fn to_encodable(&self) -> Encodable {
        Encodable::Text(self.clone())
    }
}

impl ToEncodable for bool {
    fn to_encodable(&self) -> Encodable {
        Encodable::Bool(*self)
    }
}

macro_rules! number_to_encodable {
    ($($ty:ty),*) => {
        $(
            impl ToEncodable for $ty {
                fn to_encodable(&self) -> Encodable {
                    Encodable::Number(*self as f64)
                }
            }
        )*
    };
}

number_to_encodable!(f32, f64, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl<T: ToEncodable> ToEncodable for Option<T> {
    fn to_encodable(&self) -> Encodable {
        self.as_ref().map_or(Encodable::Null, ToEncodable::to_encodable)
    }
}

impl<T: ToEncodable> ToEncodable for [T] {
    fn to_encodable(&self) -> Encodable {
        Encodable::List(self.iter().map(ToEncodable::to_encodable).collect())
    }
}

impl<T: ToEncodable> ToEncodable for Vec<T> {
    fn to_encodable(&self) -> Encodable {
        self.as_slice().to_encodable()
    }
}

impl<A: ToEncodable, B: ToEncodable> ToEncodable for (A, B) {
    fn to_encodable(&self) -> Encodable {
        Encodable::List(vec![self.0.to_encodable(), self.1.to_encodable()])
    }
}

impl<T: ToEncodable + ?Sized> ToEncodable for &T {
    fn to_encodable(&self) -> Encodable {
        (**self).to_encodable()
    }
}
