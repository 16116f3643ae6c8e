//! Parse-or-fail helpers for query parameters.
//!
//! Every helper receives the parameter as it came out of the query string
//! (`None` when absent). Blank parameters count as absent. A failure is
//! never surfaced to the user: the state store substitutes the fallback.

use std::any::type_name;
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("parameter is missing")]
    Missing,

    #[error("invalid percent-encoding in `{0}`")]
    Encoding(String),

    #[error("cannot parse `{value}` as {expected}")]
    Invalid { value: String, expected: &'static str },

    #[error("`{value}` is not one of {allowed:?}")]
    NotAllowed { value: String, allowed: Vec<String> },

    #[error("{value} is below the minimum of {min}")]
    BelowMinimum { value: String, min: String },

    #[error("{value} is above the maximum of {max}")]
    AboveMaximum { value: String, max: String },

    #[error("expected {expected} elements, found {found}")]
    Arity { expected: usize, found: usize },

    /// Rejection by an external validator
    #[error("{0}")]
    Rejected(String),
}

/// Treat blank parameters as absent
fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

/// Undo the codec's percent-encoding
pub fn decode(raw: &str) -> Result<String, ParseError> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| ParseError::Encoding(raw.to_string()))
}

/// Text keeps its surrounding whitespace; numbers may be padded
fn parse_decoded<T: FromStr>(raw: &str) -> Result<T, ParseError> {
    let decoded = decode(raw)?;
    decoded
        .parse::<T>()
        .or_else(|_| decoded.trim().parse::<T>())
        .map_err(|_| ParseError::Invalid {
            value: decoded,
            expected: type_name::<T>(),
        })
}

/// A parameter that must be present
pub fn required<T: FromStr>(raw: Option<&str>) -> Result<T, ParseError> {
    let raw = present(raw).ok_or(ParseError::Missing)?;
    parse_decoded(raw)
}

/// A parameter that may be absent or blank
pub fn optional<T: FromStr>(raw: Option<&str>) -> Result<Option<T>, ParseError> {
    present(raw).map(parse_decoded::<T>).transpose()
}

/// A comma-separated list; blank elements become `None`
pub fn list<T: FromStr>(raw: Option<&str>) -> Result<Vec<Option<T>>, ParseError> {
    let raw = raw.ok_or(ParseError::Missing)?;
    raw.split(',').map(|item| optional(Some(item))).collect()
}

/// A two-element list, e.g. a `[min, max]` range
pub fn pair<T: FromStr>(raw: Option<&str>) -> Result<(Option<T>, Option<T>), ParseError> {
    let mut items = list(raw)?;
    if items.len() != 2 {
        return Err(ParseError::Arity {
            expected: 2,
            found: items.len(),
        });
    }
    let second = items.pop().flatten();
    let first = items.pop().flatten();
    Ok((first, second))
}

/// A text parameter restricted to a known set of values
pub fn one_of<S: AsRef<str>>(raw: Option<&str>, allowed: &[S]) -> Result<String, ParseError> {
    let value: String = required(raw)?;
    if allowed.iter().any(|a| a.as_ref() == value) {
        Ok(value)
    } else {
        Err(ParseError::NotAllowed {
            value,
            allowed: allowed.iter().map(|a| a.as_ref().to_string()).collect(),
        })
    }
}

/// A number that must be at least `min`
pub fn at_least<T>(raw: Option<&str>, min: T) -> Result<T, ParseError>
where
    T: FromStr + PartialOrd + Display,
{
    let value: T = required(raw)?;
    if value < min {
        return Err(ParseError::BelowMinimum {
            value: value.to_string(),
            min: min.to_string(),
        });
    }
    Ok(value)
}

/// A number in `min..=max`
pub fn within<T>(raw: Option<&str>, min: T, max: T) -> Result<T, ParseError>
where
    T: FromStr + PartialOrd + Display,
{
    let value = at_least(raw, min)?;
    if value > max {
        return Err(ParseError::AboveMaximum {
            value: value.to_string(),
            max: max.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_and_blank() {
        assert_eq!(required::<u32>(Some("3")), Ok(3));
        assert_eq!(required::<u32>(None), Err(ParseError::Missing));
        assert_eq!(required::<u32>(Some("   ")), Err(ParseError::Missing));
        assert!(matches!(
            required::<u32>(Some("three")),
            Err(ParseError::Invalid { .. })
        ));
    }

    #[test]
    fn test_required_text_is_decoded() {
        assert_eq!(required::<String>(Some("a%20b")), Ok("a b".to_string()));
    }

    #[test]
    fn test_text_keeps_surrounding_whitespace() {
        assert_eq!(required::<String>(Some("%20man%20")), Ok(" man ".to_string()));
        assert_eq!(optional::<String>(Some(" x")), Ok(Some(" x".to_string())));
        // Numbers still tolerate padding
        assert_eq!(required::<u32>(Some("%203")), Ok(3));
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional::<f64>(None), Ok(None));
        assert_eq!(optional::<f64>(Some("")), Ok(None));
        assert_eq!(optional::<f64>(Some("2.5")), Ok(Some(2.5)));
    }

    #[test]
    fn test_list_and_pair() {
        assert_eq!(
            list::<f64>(Some("20,,100")),
            Ok(vec![Some(20.0), None, Some(100.0)])
        );
        assert_eq!(pair::<f64>(Some("20,")), Ok((Some(20.0), None)));
        assert_eq!(pair::<f64>(Some(",")), Ok((None, None)));
        assert_eq!(
            pair::<f64>(Some("1,2,3")),
            Err(ParseError::Arity { expected: 2, found: 3 })
        );
        assert_eq!(pair::<f64>(None), Err(ParseError::Missing));
    }

    #[test]
    fn test_list_decodes_elements() {
        assert_eq!(
            list::<String>(Some("a%2Cb,c")),
            Ok(vec![Some("a,b".to_string()), Some("c".to_string())])
        );
    }

    #[test]
    fn test_one_of() {
        assert_eq!(one_of(Some("desc"), &["asc", "desc"]), Ok("desc".to_string()));
        assert!(matches!(
            one_of(Some("sideways"), &["asc", "desc"]),
            Err(ParseError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_at_least() {
        assert_eq!(at_least(Some("4"), 1_usize), Ok(4));
        assert!(matches!(
            at_least(Some("0"), 1_usize),
            Err(ParseError::BelowMinimum { .. })
        ));
        assert!(at_least::<usize>(Some("-2"), 1).is_err());
    }

    #[test]
    fn test_within() {
        assert_eq!(within(Some("4"), 1_usize, 10), Ok(4));
        assert!(matches!(
            within(Some("11"), 1_usize, 10),
            Err(ParseError::AboveMaximum { .. })
        ));
        assert!(matches!(
            within(Some("0"), 1_usize, 10),
            Err(ParseError::BelowMinimum { .. })
        ));
    }
}
