//! Raw request parameters and their decoding into typed criteria.
//!
//! Decoding never fails on request data. Keys that are not text, tokens that
//! do not coerce to the declared type and non-finite numbers are dropped and
//! logged at debug level. The only error is a top level that is neither a
//! mapping nor a sequence of pairs ([`CodecError::InvalidInput`]).
//!
//! | Raw parameter | Decoded |
//! |---------------|---------|
//! | `country=ru` | `country: exact [ru]` |
//! | `country=null` | `country: exact [Null]` |
//! | `price__gte=100` | `price: gte [100.0]` |
//! | `manu=1:nokia:true` (composite) | `manu: exact [1, nokia, true]` |

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use solar_query::{FieldType, NULL_TOKEN, Value};
use tracing::debug;

use crate::error::CodecError;

/// Comparison applied by a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Exact,
    Gte,
    Lte,
    IsNull,
    Range,
}

impl Operator {
    /// Key suffix selecting this operator; `Exact` uses the bare key.
    pub fn suffix(&self) -> &'static str {
        match self {
            Operator::Exact => "",
            Operator::Gte => "__gte",
            Operator::Lte => "__lte",
            Operator::IsNull => "__isnull",
            Operator::Range => "__range",
        }
    }

    /// Splits a raw key into the parameter name and its operator.
    ///
    /// Only `__gte` and `__lte` are recognized; every other key is an exact
    /// lookup on the whole key.
    pub fn split_key(key: &str) -> (&str, Operator) {
        for op in [Operator::Gte, Operator::Lte] {
            if let Some(name) = key.strip_suffix(op.suffix()) {
                return (name, op);
            }
        }
        (key, Operator::Exact)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Exact => write!(f, "exact"),
            Operator::Gte => write!(f, "gte"),
            Operator::Lte => write!(f, "lte"),
            Operator::IsNull => write!(f, "isnull"),
            Operator::Range => write!(f, "range"),
        }
    }
}

/// One decoded selection: an operator and its typed values.
///
/// Single-valued types produce one value per criterion; composite types one
/// value per segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub operator: Operator,
    pub values: Vec<Value>,
}

impl Criterion {
    pub fn new(operator: Operator, values: Vec<Value>) -> Self {
        Self { operator, values }
    }

    pub fn exact(value: impl Into<Value>) -> Self {
        Self::new(Operator::Exact, vec![value.into()])
    }

    /// The first value.
    pub fn value(&self) -> Option<&Value> {
        self.values.first()
    }
}

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Single(FieldType),
    /// Colon-separated segments, each with its own type. Segments past the
    /// end of the list stay text.
    Composite(Vec<FieldType>),
}

impl Default for ValueType {
    fn default() -> Self {
        ValueType::Single(FieldType::Text)
    }
}

impl From<FieldType> for ValueType {
    fn from(field_type: FieldType) -> Self {
        ValueType::Single(field_type)
    }
}

/// Declared types per parameter name. Undeclared names decode as text.
pub type TypeSpec = HashMap<String, ValueType>;

/// Decoded criteria per parameter name, in request order.
pub type Decoded = IndexMap<String, Vec<Criterion>>;

/// An untyped raw key or value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<RawValue>),
}

impl RawValue {
    /// The text form of a scalar. Invalid UTF-8, nulls and lists have none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(text) => Some(text.clone()),
            RawValue::Bytes(bytes) => std::str::from_utf8(bytes).ok().map(str::to_string),
            RawValue::Int(n) => Some(n.to_string()),
            RawValue::Float(x) => Some(x.to_string()),
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Null | RawValue::List(_) => None,
        }
    }

    /// Tokens carried by a value: one for a scalar, the scalars of a list.
    /// Nested lists are ignored.
    fn tokens(&self) -> Vec<Option<String>> {
        match self {
            RawValue::List(items) => items
                .iter()
                .filter(|item| !matches!(item, RawValue::List(_)))
                .map(RawValue::as_text)
                .collect(),
            scalar => vec![scalar.as_text()],
        }
    }

    fn from_json(value: &JsonValue) -> RawValue {
        match value {
            JsonValue::Null | JsonValue::Object(_) => RawValue::Null,
            JsonValue::Bool(b) => RawValue::Bool(*b),
            JsonValue::Number(n) => n
                .as_i64()
                .map(RawValue::Int)
                .or_else(|| n.as_f64().map(RawValue::Float))
                .unwrap_or(RawValue::Null),
            JsonValue::String(text) => RawValue::Text(text.clone()),
            JsonValue::Array(items) => RawValue::List(items.iter().map(RawValue::from_json).collect()),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<&[u8]> for RawValue {
    fn from(value: &[u8]) -> Self {
        RawValue::Bytes(value.to_vec())
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Int(value.into())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawValue::Null, Into::into)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(values: Vec<T>) -> Self {
        RawValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<RawValue>, const N: usize> From<[T; N]> for RawValue {
    fn from(values: [T; N]) -> Self {
        RawValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Raw request parameters as ordered pairs. Repeated keys are all kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawParams {
    pairs: Vec<(RawValue, RawValue)>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from key/value pairs of any raw type.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<RawValue>,
        V: Into<RawValue>,
    {
        pairs.into_iter().collect()
    }

    /// Parses an `application/x-www-form-urlencoded` query string.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    pub fn push(&mut self, key: impl Into<RawValue>, value: impl Into<RawValue>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(RawValue, RawValue)> {
        self.pairs.iter()
    }
}

impl<K: Into<RawValue>, V: Into<RawValue>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl TryFrom<&JsonValue> for RawParams {
    type Error = CodecError;

    /// Accepts an object or an array of `[key, value]` pairs. Array elements
    /// that are not pairs are skipped.
    fn try_from(value: &JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Object(map) => Ok(map
                .iter()
                .map(|(key, value)| (RawValue::Text(key.clone()), RawValue::from_json(value)))
                .collect()),
            JsonValue::Array(items) => Ok(items
                .iter()
                .filter_map(|item| match item.as_array().map(Vec::as_slice) {
                    Some([key, value]) => Some((RawValue::from_json(key), RawValue::from_json(value))),
                    _ => None,
                })
                .collect()),
            other => Err(CodecError::InvalidInput {
                found: json_kind(other).to_string(),
            }),
        }
    }
}

impl TryFrom<JsonValue> for RawParams {
    type Error = CodecError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        RawParams::try_from(&value)
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Returns `parsed`, logging the dropped token when it is `None`.
fn parse_or_skip<T>(name: &str, token: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        debug!(param = name, token = token, "Dropping undecodable parameter token");
    }
    parsed
}

/// Decodes raw parameters with a colon delimiter and a `null` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCodec {
    delimiter: char,
    null_token: String,
}

impl Default for SimpleCodec {
    fn default() -> Self {
        Self {
            delimiter: ':',
            null_token: NULL_TOKEN.to_string(),
        }
    }
}

impl SimpleCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Decodes raw parameters into criteria per name.
    ///
    /// Criteria keep request order. Names without any decodable token are
    /// left out.
    pub fn decode(&self, raw: &RawParams, types: &TypeSpec) -> Decoded {
        let mut decoded = Decoded::new();
        for (key, value) in raw.iter() {
            let Some(key) = parse_or_skip("<key>", "<non-text key>", key.as_text()) else {
                continue;
            };
            let (name, operator) = Operator::split_key(&key);
            let value_type = types.get(name).cloned().unwrap_or_default();

            for token in value.tokens() {
                let Some(token) = parse_or_skip(name, "<non-text value>", token) else {
                    continue;
                };
                let Some(values) = parse_or_skip(name, &token, self.decode_token(&token, &value_type))
                else {
                    continue;
                };
                decoded
                    .entry(name.to_string())
                    .or_default()
                    .push(Criterion::new(operator, values));
            }
        }
        decoded
    }

    /// Decodes one token. Returns `None` when any segment fails to coerce.
    pub fn decode_token(&self, token: &str, value_type: &ValueType) -> Option<Vec<Value>> {
        match value_type {
            ValueType::Single(field_type) => self.decode_segment(token, *field_type).map(|v| vec![v]),
            ValueType::Composite(types) => token
                .split(self.delimiter)
                .enumerate()
                .map(|(i, segment)| {
                    let field_type = types.get(i).copied().unwrap_or(FieldType::Text);
                    self.decode_segment(segment, field_type)
                })
                .collect(),
        }
    }

    fn decode_segment(&self, segment: &str, field_type: FieldType) -> Option<Value> {
        if segment == self.null_token {
            Some(Value::Null)
        } else {
            field_type.parse(segment)
        }
    }

    /// Encodes values into a token, joining segments with the delimiter.
    pub fn encode_values(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|value| match value {
                Value::Null => self.null_token.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(&self.delimiter.to_string())
    }

    /// Encodes a criterion back into a raw `(key, token)` pair.
    pub fn encode(&self, name: &str, criterion: &Criterion) -> (String, String) {
        (
            format!("{}{}", name, criterion.operator.suffix()),
            self.encode_values(&criterion.values),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn types(entries: &[(&str, ValueType)]) -> TypeSpec {
        entries
            .iter()
            .map(|(name, value_type)| (name.to_string(), value_type.clone()))
            .collect()
    }

    #[test]
    fn test_decode_exact_and_null() {
        let codec = SimpleCodec::new();
        let raw = RawParams::from_pairs([("country", vec!["ru", "ua", "null"])]);
        let decoded = codec.decode(&raw, &TypeSpec::new());
        assert_eq!(
            decoded["country"],
            vec![
                Criterion::exact("ru"),
                Criterion::exact("ua"),
                Criterion::exact(Value::Null),
            ]
        );
    }

    #[test]
    fn test_decode_composite() {
        let codec = SimpleCodec::new();
        let raw = RawParams::from_pairs([("manu", vec!["1:nokia:true", "2:samsung:false"])]);
        let spec = types(&[(
            "manu",
            ValueType::Composite(vec![FieldType::Integer, FieldType::Text, FieldType::Boolean]),
        )]);
        let decoded = codec.decode(&raw, &spec);
        assert_eq!(
            decoded["manu"],
            vec![
                Criterion::new(
                    Operator::Exact,
                    vec![Value::Int(1), Value::from("nokia"), Value::Bool(true)]
                ),
                Criterion::new(
                    Operator::Exact,
                    vec![Value::Int(2), Value::from("samsung"), Value::Bool(false)]
                ),
            ]
        );
    }

    #[test]
    fn test_composite_segment_failure_drops_token() {
        let codec = SimpleCodec::new();
        let spec = ValueType::Composite(vec![FieldType::Integer, FieldType::Text]);
        assert_eq!(codec.decode_token("x:nokia", &spec), None);
        assert_eq!(
            codec.decode_token("1:nokia:extra", &spec),
            Some(vec![Value::Int(1), Value::from("nokia"), Value::from("extra")])
        );
        assert_eq!(
            codec.decode_token("null", &spec),
            Some(vec![Value::Null])
        );
    }

    #[test]
    fn test_decode_boolean() {
        let codec = SimpleCodec::new();
        let raw = RawParams::from_pairs([("is_active", "true")]);
        let decoded = codec.decode(&raw, &types(&[("is_active", FieldType::Boolean.into())]));
        assert_eq!(decoded["is_active"], vec![Criterion::exact(true)]);
    }

    #[test]
    fn test_decode_drops_non_finite_floats() {
        let codec = SimpleCodec::new();
        let raw = RawParams::from_pairs([
            ("price__gte", vec!["100.1", "Inf"]),
            ("price__lte", vec!["200", "NaN"]),
        ]);
        let decoded = codec.decode(&raw, &types(&[("price", FieldType::Float.into())]));
        assert_eq!(decoded.len(), 1);
        assert_eq!(
            decoded["price"],
            vec![
                Criterion::new(Operator::Gte, vec![Value::Float(100.1)]),
                Criterion::new(Operator::Lte, vec![Value::Float(200.0)]),
            ]
        );
    }

    #[test]
    fn test_names_without_valid_tokens_are_omitted() {
        let codec = SimpleCodec::new();
        let raw = RawParams::from_pairs([("count", vec!["a", "b"])]);
        let decoded = codec.decode(&raw, &types(&[("count", FieldType::Integer.into())]));
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_repeated_pairs_are_kept() {
        let codec = SimpleCodec::new();
        let raw = RawParams::from_query_string("?cat=5&region=kiev&cat=13");
        let decoded = codec.decode(&raw, &TypeSpec::new());
        assert_eq!(
            decoded["cat"],
            vec![Criterion::exact("5"), Criterion::exact("13")]
        );
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["cat", "region"]);
    }

    #[test]
    fn test_insane_input_is_tolerated() {
        let codec = SimpleCodec::new();
        let mut raw = RawParams::new();
        raw.push(111, 222);
        raw.push("\u{fffd}", "");
        raw.push("\u{ffff}".as_bytes(), "");
        raw.push(RawValue::Bytes(vec![0xff, 0xfe]), "x");
        raw.push(
            "test",
            RawValue::List(vec![
                RawValue::from("\u{fffd}"),
                RawValue::Bytes(vec![0xff]),
                RawValue::List(vec![RawValue::from("nested")]),
                RawValue::Null,
            ]),
        );
        raw.push(RawValue::Null, "y");

        let decoded = codec.decode(&raw, &TypeSpec::new());
        assert_eq!(decoded["111"], vec![Criterion::exact("222")]);
        assert_eq!(decoded["\u{ffff}"], vec![Criterion::exact("")]);
        assert_eq!(decoded["test"], vec![Criterion::exact("\u{fffd}")]);
        assert_eq!(decoded.len(), 4);
    }

    #[test]
    fn test_raw_params_from_json() {
        let raw = RawParams::try_from(&json!({"cat": ["5", 13], "flag": true})).unwrap();
        let decoded = SimpleCodec::new().decode(&raw, &TypeSpec::new());
        assert_eq!(decoded["cat"], vec![Criterion::exact("5"), Criterion::exact("13")]);
        assert_eq!(decoded["flag"], vec![Criterion::exact("true")]);

        let raw = RawParams::try_from(&json!([["cat", "5"], ["cat", "6"], "junk"])).unwrap();
        assert_eq!(raw.len(), 2);

        let err = RawParams::try_from(&json!("")).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidInput {
                found: "string".into()
            }
        );
    }

    #[test]
    fn test_encode_round_trips_single_exact() {
        let codec = SimpleCodec::new();
        for token in ["ru", "null", "13"] {
            let raw = RawParams::from_pairs([("country", token)]);
            let decoded = codec.decode(&raw, &TypeSpec::new());
            let (key, encoded) = codec.encode("country", &decoded["country"][0]);
            assert_eq!(key, "country");
            assert_eq!(encoded, token);
        }

        let criterion = Criterion::new(Operator::Gte, vec![Value::Float(100.5)]);
        assert_eq!(
            codec.encode("price", &criterion),
            ("price__gte".to_string(), "100.5".to_string())
        );
    }
}
