use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Largest text (in bytes) or collection (in items) repetition may build
pub const MAX_REPEAT_LEN: usize = 10_000_000;

/// Number of copies to make of something `len` long, or a value error when
/// the result would exceed [`MAX_REPEAT_LEN`]. Negative counts repeat zero
/// times.
fn repeat_count(len: usize, times: i64, what: &str) -> Result<usize> {
    if len == 0 {
        return Ok(0);
    }
    let times = usize::try_from(times.max(0)).unwrap_or(usize::MAX);
    match len.checked_mul(times) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(times),
        _ => Err(Error::value(format!(
            "{} is too large to repeat {} times",
            what, times
        ))),
    }
}

/// `text` repeated `times` times, bounded by [`MAX_REPEAT_LEN`]
pub fn repeat_text(text: &str, times: i64) -> Result<String> {
    let times = repeat_count(text.len(), times, "text")?;
    Ok(text.repeat(times))
}

/// Runtime value representation
///
/// Serialises untagged, so a persisted value is plain JSON (`5`, `"text"`,
/// `[1, 2]`, `{"a": 1}`, `null`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value (`nothing`)
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer value
    Int(i64),
    /// 64-bit floating-point value
    Float(f64),
    /// Text value
    Text(String),
    /// Ordered collection (reference-counted)
    List(Arc<Vec<Value>>),
    /// Record with named fields (reference-counted)
    Map(Arc<BTreeMap<String, Value>>),
}

impl Value {
    /// Creates a list value from a vector of values
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Arc::new(values))
    }

    /// Creates a map value from its fields
    pub fn map(fields: BTreeMap<String, Value>) -> Self {
        Value::Map(Arc::new(fields))
    }

    /// Creates a text value
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Interprets a line of user input: integers first, then decimals,
    /// otherwise the text itself
    pub fn parse_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            Value::Int(n)
        } else if let Some(x) = parse_decimal(trimmed) {
            Value::Float(x)
        } else {
            Value::Text(raw.to_string())
        }
    }

    /// Returns the user-facing type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nothing",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "decimal",
            Value::Text(_) => "text",
            Value::List(_) => "collection",
            Value::Map(_) => "map",
        }
    }

    /// Returns true if the value is truthy in a boolean context
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(fields) => !fields.is_empty(),
        }
    }

    /// Empty text, an empty collection or nothing
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// True for integers and decimals
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric view of integers and decimals
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    // Type conversion methods

    /// Converts value to a 64-bit integer, truncating decimals and
    /// parsing numeric text
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Text(s) => s.trim().parse().map_err(|_| Error::TypeError {
                expected: "integer".to_string(),
                got: format!("text \"{}\"", s),
            }),
            _ => Err(Error::TypeError {
                expected: "integer".to_string(),
                got: self.type_name().to_string(),
            }),
        }
    }

    /// Converts value to a 64-bit floating-point number
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            Value::Text(s) => parse_decimal(s.trim()).ok_or_else(|| Error::TypeError {
                expected: "number".to_string(),
                got: format!("text \"{}\"", s),
            }),
            _ => Err(Error::TypeError {
                expected: "number".to_string(),
                got: self.type_name().to_string(),
            }),
        }
    }

    /// Returns the items of a collection
    pub fn as_list(&self) -> Result<&[Value]> {
        match self {
            Value::List(items) => Ok(items),
            _ => Err(Error::TypeError {
                expected: "collection".to_string(),
                got: self.type_name().to_string(),
            }),
        }
    }

    /// Ordering between two values, when one is defined
    ///
    /// Numbers compare numerically across integers and decimals, text
    /// lexicographically and collections item by item.
    pub fn ordering(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.ordering(y)? {
                        Ordering::Equal => continue,
                        unequal => return Some(unequal),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => {
                let (a, b) = (self.as_number()?, other.as_number()?);
                a.partial_cmp(&b)
            }
        }
    }

    /// Ordering that fails with a type error when the pair is incomparable
    pub fn compare(&self, other: &Value, op: &str) -> Result<Ordering> {
        self.ordering(other)
            .ok_or_else(|| self.invalid_operation(op, other))
    }

    // Arithmetic

    /// `+` on numbers, text and collections
    pub fn add(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a
                .checked_add(*b)
                .map(Value::Int)
                .unwrap_or(Value::Float(*a as f64 + *b as f64))),
            (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{}{}", a, b))),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::list(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => self.float_op(other, "+", |a, b| a + b),
        }
    }

    /// `-` on numbers
    pub fn sub(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a
                .checked_sub(*b)
                .map(Value::Int)
                .unwrap_or(Value::Float(*a as f64 - *b as f64))),
            _ => self.float_op(other, "-", |a, b| a - b),
        }
    }

    /// `*` on numbers, and text or collections repeated an integer number
    /// of times
    pub fn mul(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a
                .checked_mul(*b)
                .map(Value::Int)
                .unwrap_or(Value::Float(*a as f64 * *b as f64))),
            (Value::Text(s), Value::Int(n)) | (Value::Int(n), Value::Text(s)) => {
                Ok(Value::Text(repeat_text(s, *n)?))
            }
            (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
                let times = repeat_count(items.len(), *n, "collection")?;
                let mut out = Vec::new();
                for _ in 0..times {
                    out.extend(items.iter().cloned());
                }
                Ok(Value::list(out))
            }
            _ => self.float_op(other, "*", |a, b| a * b),
        }
    }

    /// `/` always produces a decimal
    pub fn div(&self, other: &Value) -> Result<Value> {
        match (self.as_number(), other.as_number()) {
            (Some(_), Some(b)) if b == 0.0 => Err(Error::DivisionByZero),
            (Some(a), Some(b)) => Ok(Value::Float(a / b)),
            _ => Err(self.invalid_operation("/", other)),
        }
    }

    fn float_op(&self, other: &Value, op: &str, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(f(a, b))),
            _ => Err(self.invalid_operation(op, other)),
        }
    }

    fn invalid_operation(&self, op: &str, other: &Value) -> Error {
        Error::InvalidOperation {
            op: op.to_string(),
            left_type: self.type_name().to_string(),
            right_type: other.type_name().to_string(),
        }
    }
}

/// Parses a decimal the way user input is read: plain digits with an
/// optional sign, fraction and exponent. Rejects `inf`/`nan` spellings.
fn parse_decimal(s: &str) -> Option<f64> {
    let looks_numeric = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && s.chars().any(|c| c.is_ascii_digit());
    if looks_numeric {
        s.parse().ok()
    } else {
        None
    }
}

/// Renders a decimal without a fraction when it holds a whole number
fn format_float(f: f64, out: &mut fmt::Formatter) -> fmt::Result {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        write!(out, "{}", f as i64)
    } else {
        write!(out, "{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "nothing"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => format_float(*x, f),
            Value::Text(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, val) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            Value::Map(fields) => {
                write!(f, "{{")?;
                for (i, (key, val)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Integers and decimals compare by numeric value
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_number() == other.as_number()
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "nothing");
        assert_eq!(Value::Bool(true).type_name(), "boolean");
        assert_eq!(Value::Int(42).type_name(), "integer");
        assert_eq!(Value::Float(2.5).type_name(), "decimal");
        assert_eq!(Value::text("hi").type_name(), "text");
        assert_eq!(Value::list(vec![]).type_name(), "collection");
        assert_eq!(Value::map(BTreeMap::new()).type_name(), "map");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(42).is_truthy());
        assert!(!Value::text("").is_truthy());
        assert!(Value::text("test").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
    }

    #[test]
    fn test_rendering() {
        assert_eq!(Value::Float(5.0).to_string(), "5");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.to_string(), "nothing");
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::text("a"), Value::Bool(false)]).to_string(),
            "[1, a, false]"
        );
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::text("Ada"));
        fields.insert("age".to_string(), Value::Int(36));
        assert_eq!(Value::map(fields).to_string(), "{age: 36, name: Ada}");
    }

    #[test]
    fn test_numeric_equality() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert_ne!(Value::Int(3), Value::text("3"));
        assert_eq!(
            Value::list(vec![Value::Int(1)]),
            Value::list(vec![Value::Float(1.0)])
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(Value::Int(2).add(&Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(Value::Int(2).add(&Value::Float(0.5)).unwrap(), Value::Float(2.5));
        assert_eq!(
            Value::text("ab").add(&Value::text("cd")).unwrap(),
            Value::text("abcd")
        );
        assert_eq!(Value::text("ab").mul(&Value::Int(3)).unwrap(), Value::text("ababab"));
        assert_eq!(Value::Int(7).div(&Value::Int(2)).unwrap(), Value::Float(3.5));
        assert!(matches!(
            Value::Int(1).div(&Value::Int(0)),
            Err(Error::DivisionByZero)
        ));
        assert!(matches!(
            Value::text("apples").sub(&Value::Int(3)),
            Err(Error::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_integer_overflow_widens() {
        assert!(matches!(
            Value::Int(i64::MAX).add(&Value::Int(1)).unwrap(),
            Value::Float(_)
        ));
    }

    #[test]
    fn test_repetition_is_bounded() {
        let huge = Value::Int(i64::MAX);
        let err = Value::text("ab").mul(&huge).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("text is too large to repeat {} times", i64::MAX)
        );

        let items = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(matches!(items.mul(&huge), Err(Error::ValueError(_))));
        assert!(matches!(huge.mul(&items), Err(Error::ValueError(_))));

        assert_eq!(Value::text("ab").mul(&Value::Int(-2)).unwrap(), Value::text(""));
        assert_eq!(repeat_text("", i64::MAX).unwrap(), "");
        assert_eq!(Value::list(vec![]).mul(&huge).unwrap(), Value::list(vec![]));
        assert!(repeat_text("x", MAX_REPEAT_LEN as i64 + 1).is_err());
    }

    #[test]
    fn test_ordering() {
        assert_eq!(
            Value::Int(2).ordering(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::text("b").ordering(&Value::text("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::text("b").ordering(&Value::Int(1)), None);
        assert!(Value::Null.compare(&Value::Int(1), ">").is_err());
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(Value::parse_input("42"), Value::Int(42));
        assert!(matches!(Value::parse_input("4.5"), Value::Float(_)));
        assert_eq!(Value::parse_input("Ada"), Value::text("Ada"));
        assert_eq!(Value::parse_input("inf"), Value::text("inf"));
    }

    #[test]
    fn test_json_shape() {
        let v = Value::list(vec![Value::Int(1), Value::text("x"), Value::Null]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"[1,"x",null]"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        let decimal: Value = serde_json::from_str("2.5").unwrap();
        assert!(matches!(decimal, Value::Float(_)));
    }
}
