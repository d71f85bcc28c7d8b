//! Typed scalar values and field type coercion.
//!
//! Request parameters arrive as text and engine responses arrive as JSON; both
//! are coerced into [`Value`] through a declared [`FieldType`]. The text form
//! produced by [`Value`]'s `Display` implementation is the form used in request
//! parameters, so `FieldType::parse(value.to_string())` round-trips.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Reserved request token that decodes to [`Value::Null`].
pub const NULL_TOKEN: &str = "null";

/// A typed scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The missing-value bucket.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A finite floating point number.
    Float(f64),
    /// Free text.
    Text(String),
    /// A calendar date.
    Date(NaiveDate),
    /// A UTC timestamp.
    DateTime(DateTime<Utc>),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text if this is a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the value as an integer when it is integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Returns the value as a float when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the boolean if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts an untyped JSON scalar into a value without a declared type.
    ///
    /// Strings stay text; arrays and objects have no scalar form.
    pub fn from_json(raw: &serde_json::Value) -> Option<Value> {
        match raw {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float)),
            serde_json::Value::String(text) => Some(Value::Text(text.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str(NULL_TOKEN),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            // Debug keeps the fractional part: 200.0 rather than 200
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(text) => f.write_str(text),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::DateTime(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Declared type of a field, used to coerce text and JSON into [`Value`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Text, kept as-is.
    #[default]
    Text,
    /// 64-bit signed integers.
    Integer,
    /// Finite 64-bit floats.
    Float,
    /// `true`/`false` (also `1`/`0`, `on`/`off`, `yes`/`no`).
    Boolean,
    /// `YYYY-MM-DD` dates.
    Date,
    /// RFC 3339 timestamps, normalized to UTC.
    #[serde(rename = "datetime")]
    DateTime,
}

impl FieldType {
    /// Parses request text into a value of this type.
    ///
    /// Returns `None` when the text cannot be coerced. Non-finite floats
    /// (`NaN`, `inf`) are rejected.
    pub fn parse(&self, text: &str) -> Option<Value> {
        match self {
            FieldType::Text => Some(Value::Text(text.to_string())),
            FieldType::Integer => text.trim().parse::<i64>().ok().map(Value::Int),
            FieldType::Float => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float),
            FieldType::Boolean => parse_bool(text.trim()).map(Value::Bool),
            FieldType::Date => parse_date(text.trim()).map(Value::Date),
            FieldType::DateTime => parse_datetime(text.trim()).map(Value::DateTime),
        }
    }

    /// Coerces a JSON value returned by the engine into a value of this type.
    ///
    /// JSON `null` always maps to [`Value::Null`]; arrays and objects never
    /// coerce.
    pub fn parse_json(&self, raw: &serde_json::Value) -> Option<Value> {
        match raw {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::String(text) => self.parse(text),
            serde_json::Value::Bool(b) => match self {
                FieldType::Boolean => Some(Value::Bool(*b)),
                _ => self.parse(if *b { "true" } else { "false" }),
            },
            serde_json::Value::Number(n) => match self {
                FieldType::Integer => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                    .map(Value::Int),
                FieldType::Float => n.as_f64().filter(|f| f.is_finite()).map(Value::Float),
                _ => self.parse(&n.to_string()),
            },
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Formats a value into its request-parameter text form.
    pub fn format(&self, value: &Value) -> String {
        value.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Date => write!(f, "date"),
            FieldType::DateTime => write!(f, "datetime"),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Ok(FieldType::Text),
            "integer" | "int" => Ok(FieldType::Integer),
            "float" | "double" => Ok(FieldType::Float),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "date" => Ok(FieldType::Date),
            "datetime" => Ok(FieldType::DateTime),
            _ => Err(format!("unknown field type: {}", s)),
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|ts| ts.date_naive()))
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_float_rejects_non_finite() {
        assert_eq!(FieldType::Float.parse("100.1"), Some(Value::Float(100.1)));
        assert_eq!(FieldType::Float.parse("NaN"), None);
        assert_eq!(FieldType::Float.parse("Inf"), None);
        assert_eq!(FieldType::Float.parse("-infinity"), None);
        assert_eq!(FieldType::Float.parse("abc"), None);
    }

    #[test]
    fn test_integer_and_boolean_parse() {
        assert_eq!(FieldType::Integer.parse("13"), Some(Value::Int(13)));
        assert_eq!(FieldType::Integer.parse("1.5"), None);
        assert_eq!(FieldType::Boolean.parse("TRUE"), Some(Value::Bool(true)));
        assert_eq!(FieldType::Boolean.parse("0"), Some(Value::Bool(false)));
        assert_eq!(FieldType::Boolean.parse(""), None);
    }

    #[test]
    fn test_display_is_request_form() {
        assert_eq!(Value::Float(200.0).to_string(), "200.0");
        assert_eq!(Value::Float(100.1).to_string(), "100.1");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Null.to_string(), "null");

        let date = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2020-01-31");
        let ts = date.and_hms_opt(12, 0, 0).unwrap().and_utc();
        assert_eq!(Value::DateTime(ts).to_string(), "2020-01-31T12:00:00Z");
    }

    #[test]
    fn test_datetime_round_trip() {
        let value = FieldType::DateTime.parse("2020-01-31T12:00:00+02:00").unwrap();
        assert_eq!(value.to_string(), "2020-01-31T10:00:00Z");
        assert_eq!(FieldType::DateTime.parse(&value.to_string()), Some(value));
    }

    #[test]
    fn test_parse_json() {
        assert_eq!(FieldType::Integer.parse_json(&json!("100")), Some(Value::Int(100)));
        assert_eq!(FieldType::Integer.parse_json(&json!(5)), Some(Value::Int(5)));
        assert_eq!(FieldType::Boolean.parse_json(&json!(true)), Some(Value::Bool(true)));
        assert_eq!(FieldType::Text.parse_json(&json!(true)), Some(Value::from("true")));
        assert_eq!(FieldType::Float.parse_json(&json!(3.5)), Some(Value::Float(3.5)));
        assert_eq!(FieldType::Integer.parse_json(&json!(null)), Some(Value::Null));
        assert_eq!(FieldType::Integer.parse_json(&json!("n/a")), None);
        assert_eq!(FieldType::Text.parse_json(&json!([1])), None);
    }

    #[test]
    fn test_field_type_from_str() {
        assert_eq!("Integer".parse::<FieldType>().unwrap(), FieldType::Integer);
        assert_eq!("bool".parse::<FieldType>().unwrap(), FieldType::Boolean);
        assert!("decimal".parse::<FieldType>().is_err());
    }
}
