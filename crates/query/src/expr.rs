//! Boolean criteria trees and their query syntax.
//!
//! An [`Expr`] is built from field lookups and combined with `&`, `|` and `!`.
//! Its `Display` implementation produces the engine's query syntax:
//!
//! | Expression | Output |
//! |------------|--------|
//! | `Expr::exact("country", "us")` | `country:"us"` |
//! | `Expr::exact("country", Value::Null)` | `(*:* NOT country:[* TO *])` |
//! | `Expr::gte("price", 100.0)` | `price:[100.0 TO *]` |
//! | `Expr::isnull("price", false)` | `price:[* TO *]` |
//! | `a \| b` | `(a OR b)` |
//! | `!a` | `(*:* NOT a)` |

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use crate::value::Value;

/// Characters with a meaning in the standard query parser.
const QUERY_SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
    '/',
];

/// Characters escaped inside range bounds. Date math (`NOW/DAY-1DAY`) is left
/// intact.
const RANGE_SPECIAL_CHARS: &[char] = &['[', ']', '{', '}', '"', '\\'];

/// The lookup applied to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Equality. `Null` matches documents without the field.
    Exact(Value),
    /// Inclusive lower bound.
    Gte(Value),
    /// Inclusive upper bound.
    Lte(Value),
    /// Inclusive range; `None` leaves that side open.
    Range(Option<Value>, Option<Value>),
    /// `true` matches documents without the field, `false` documents with it.
    IsNull(bool),
}

/// A boolean criteria tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A lookup on one field.
    Term { field: String, lookup: Lookup },
    /// Query text passed through verbatim.
    Raw(String),
    /// Every child must match. No children matches everything.
    And(Vec<Expr>),
    /// Any child must match. No children matches nothing.
    Or(Vec<Expr>),
    /// The child must not match.
    Not(Box<Expr>),
}

impl Expr {
    /// Creates a lookup on `field`.
    pub fn term(field: impl Into<String>, lookup: Lookup) -> Self {
        Expr::Term {
            field: field.into(),
            lookup,
        }
    }

    pub fn exact(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::term(field, Lookup::Exact(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::term(field, Lookup::Gte(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::term(field, Lookup::Lte(value.into()))
    }

    pub fn range(field: impl Into<String>, lower: Option<Value>, upper: Option<Value>) -> Self {
        Expr::term(field, Lookup::Range(lower, upper))
    }

    pub fn isnull(field: impl Into<String>, is_null: bool) -> Self {
        Expr::term(field, Lookup::IsNull(is_null))
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Expr::Raw(text.into())
    }

    /// Conjunction of `children`.
    pub fn and(children: impl IntoIterator<Item = Expr>) -> Self {
        Expr::And(children.into_iter().collect())
    }

    /// Disjunction of `children`.
    pub fn or(children: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Or(children.into_iter().collect())
    }

    /// Disjunction of exact matches of `field` against each value.
    pub fn any_of<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Expr::Or(
            values
                .into_iter()
                .map(|value| Expr::exact(field, value))
                .collect(),
        )
    }

    /// Returns true for an `And` or `Or` without children.
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(children) | Expr::Or(children) => children.is_empty(),
            _ => false,
        }
    }
}

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        let mut children = match self {
            Expr::And(children) => children,
            other => vec![other],
        };
        match rhs {
            Expr::And(more) => children.extend(more),
            other => children.push(other),
        }
        Expr::And(children)
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        let mut children = match self {
            Expr::Or(children) => children,
            other => vec![other],
        };
        match rhs {
            Expr::Or(more) => children.extend(more),
            other => children.push(other),
        }
        Expr::Or(children)
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Term { field, lookup } => write_term(f, field, lookup),
            Expr::Raw(text) => f.write_str(text),
            Expr::And(children) if children.is_empty() => f.write_str("*:*"),
            Expr::Or(children) if children.is_empty() => f.write_str("(*:* NOT *:*)"),
            Expr::And(children) => write_joined(f, children, " AND "),
            Expr::Or(children) => write_joined(f, children, " OR "),
            Expr::Not(child) => write!(f, "(*:* NOT {})", child),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Expr], op: &str) -> fmt::Result {
    if let [only] = children {
        return write!(f, "{}", only);
    }
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(op)?;
        }
        write!(f, "{}", child)?;
    }
    f.write_str(")")
}

fn write_term(f: &mut fmt::Formatter<'_>, field: &str, lookup: &Lookup) -> fmt::Result {
    match lookup {
        Lookup::Exact(Value::Null) | Lookup::IsNull(true) => {
            write!(f, "(*:* NOT {}:[* TO *])", field)
        }
        Lookup::IsNull(false) => write!(f, "{}:[* TO *]", field),
        Lookup::Exact(value) => write!(f, "{}:\"{}\"", field, quote_phrase(&value.to_string())),
        Lookup::Gte(value) => write!(f, "{}:[{} TO *]", field, range_bound(Some(value))),
        Lookup::Lte(value) => write!(f, "{}:[* TO {}]", field, range_bound(Some(value))),
        Lookup::Range(lower, upper) => write!(
            f,
            "{}:[{} TO {}]",
            field,
            range_bound(lower.as_ref()),
            range_bound(upper.as_ref())
        ),
    }
}

fn quote_phrase(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn range_bound(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return "*".to_string();
    };
    let text = value.to_string();
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_whitespace() || RANGE_SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escapes every reserved query-syntax character in free text.
pub fn escape_query(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_whitespace() || QUERY_SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_quotes_and_escapes() {
        assert_eq!(Expr::exact("country", "us").to_string(), "country:\"us\"");
        assert_eq!(Expr::exact("category", 5).to_string(), "category:\"5\"");
        assert_eq!(
            Expr::exact("name", "say \"hi\"").to_string(),
            "name:\"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn test_null_lookups() {
        assert_eq!(
            Expr::exact("category", Value::Null).to_string(),
            "(*:* NOT category:[* TO *])"
        );
        assert_eq!(
            Expr::isnull("category", true).to_string(),
            "(*:* NOT category:[* TO *])"
        );
        assert_eq!(Expr::isnull("category", false).to_string(), "category:[* TO *]");
    }

    #[test]
    fn test_ranges() {
        assert_eq!(Expr::gte("price", 100.0).to_string(), "price:[100.0 TO *]");
        assert_eq!(Expr::lte("price", 200.0).to_string(), "price:[* TO 200.0]");
        assert_eq!(
            Expr::range("price", Some(Value::Int(1)), None).to_string(),
            "price:[1 TO *]"
        );
        assert_eq!(
            Expr::gte("date_created", "NOW/DAY-1DAY").to_string(),
            "date_created:[NOW/DAY-1DAY TO *]"
        );
        assert_eq!(Expr::gte("title", "a b").to_string(), "title:[a\\ b TO *]");
    }

    #[test]
    fn test_combinators() {
        let expr = Expr::exact("a", 1) | Expr::exact("b", 2) | Expr::exact("c", 3);
        assert_eq!(expr.to_string(), "(a:\"1\" OR b:\"2\" OR c:\"3\")");

        let expr = (Expr::exact("a", 1) & Expr::exact("b", 2)) | Expr::exact("c", 3);
        assert_eq!(expr.to_string(), "((a:\"1\" AND b:\"2\") OR c:\"3\")");

        let expr = !Expr::exact("status", 0);
        assert_eq!(expr.to_string(), "(*:* NOT status:\"0\")");
    }

    #[test]
    fn test_single_child_is_bare() {
        assert_eq!(Expr::any_of("country", ["us"]).to_string(), "country:\"us\"");
        assert_eq!(
            Expr::and([Expr::raw("{!geofilt d=5}")]).to_string(),
            "{!geofilt d=5}"
        );
    }

    #[test]
    fn test_empty_combinators() {
        assert_eq!(Expr::and([]).to_string(), "*:*");
        assert_eq!(Expr::or([]).to_string(), "(*:* NOT *:*)");
        assert!(Expr::or([]).is_empty());
    }

    #[test]
    fn test_escape_query() {
        assert_eq!(escape_query("a+b (c)"), "a\\+b\\ \\(c\\)");
        assert_eq!(escape_query("http://x"), "http\\:\\/\\/x");
        assert_eq!(escape_query("plain"), "plain");
    }
}
