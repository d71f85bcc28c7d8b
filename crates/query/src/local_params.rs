//! Local params: the `{!type key=value}` prefix attached to query clauses.
//!
//! Keys keep their insertion order. `tag` and `ex` are list-valued: adding to
//! them appends and de-duplicates instead of replacing, so a caller's own tags
//! and exclusions survive when a filter adds its own.

use std::fmt;

use indexmap::IndexMap;

/// Keys whose values are comma-separated lists.
pub const LIST_KEYS: &[&str] = &["tag", "ex"];

/// A single local param value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalValue {
    Single(String),
    List(Vec<String>),
}

impl LocalValue {
    fn into_list(self) -> Vec<String> {
        match self {
            LocalValue::Single(value) => vec![value],
            LocalValue::List(values) => values,
        }
    }

    /// Returns the list items, or the single value as a one-item list.
    pub fn items(&self) -> Vec<&str> {
        match self {
            LocalValue::Single(value) => vec![value.as_str()],
            LocalValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for LocalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LocalValue::Single(value) => value.clone(),
            LocalValue::List(values) => values.join(","),
        };
        if needs_quoting(&text) {
            write!(f, "'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
        } else {
            f.write_str(&text)
        }
    }
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '\'' | '"'))
}

impl From<&str> for LocalValue {
    fn from(value: &str) -> Self {
        LocalValue::Single(value.to_string())
    }
}

impl From<String> for LocalValue {
    fn from(value: String) -> Self {
        LocalValue::Single(value)
    }
}

impl From<&String> for LocalValue {
    fn from(value: &String) -> Self {
        LocalValue::Single(value.clone())
    }
}

impl From<bool> for LocalValue {
    fn from(value: bool) -> Self {
        LocalValue::Single(value.to_string())
    }
}

impl From<i64> for LocalValue {
    fn from(value: i64) -> Self {
        LocalValue::Single(value.to_string())
    }
}

impl From<i32> for LocalValue {
    fn from(value: i32) -> Self {
        LocalValue::Single(value.to_string())
    }
}

impl From<f64> for LocalValue {
    fn from(value: f64) -> Self {
        LocalValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for LocalValue {
    fn from(values: Vec<String>) -> Self {
        LocalValue::List(values)
    }
}

impl From<Vec<&str>> for LocalValue {
    fn from(values: Vec<&str>) -> Self {
        LocalValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for LocalValue {
    fn from(values: [&str; N]) -> Self {
        LocalValue::List(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Ordered local params with an optional positional query type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalParams {
    kind: Option<String>,
    entries: IndexMap<String, LocalValue>,
}

impl LocalParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local params with a positional query type, as in `{!geofilt ...}`.
    pub fn of_type(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            entries: IndexMap::new(),
        }
    }

    /// Builder form of [`LocalParams::add`].
    pub fn with(mut self, key: &str, value: impl Into<LocalValue>) -> Self {
        self.add(key, value);
        self
    }

    /// Returns the positional query type.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn set_kind(&mut self, kind: impl Into<String>) {
        self.kind = Some(kind.into());
    }

    /// Replaces the value of `key`, keeping its position if already present.
    pub fn set(&mut self, key: &str, value: impl Into<LocalValue>) {
        let value = value.into();
        let value = if LIST_KEYS.contains(&key) {
            LocalValue::List(dedup(value.into_list()))
        } else {
            value
        };
        self.entries.insert(key.to_string(), value);
    }

    /// Adds to `key`.
    ///
    /// For `tag` and `ex` the values are appended to the existing list,
    /// skipping duplicates. Other keys are replaced.
    pub fn add(&mut self, key: &str, value: impl Into<LocalValue>) {
        if !LIST_KEYS.contains(&key) {
            self.set(key, value);
            return;
        }
        let incoming = value.into().into_list();
        match self.entries.get_mut(key) {
            Some(existing) => {
                let mut values = std::mem::replace(existing, LocalValue::List(Vec::new())).into_list();
                values.extend(incoming);
                *existing = LocalValue::List(dedup(values));
            }
            None => {
                self.entries
                    .insert(key.to_string(), LocalValue::List(dedup(incoming)));
            }
        }
    }

    /// Adds every entry of `other`. The positional type is taken from `other`
    /// only when this one has none.
    pub fn merge(&mut self, other: &LocalParams) {
        if self.kind.is_none() {
            self.kind = other.kind.clone();
        }
        for (key, value) in &other.entries {
            self.add(key, value.clone());
        }
    }

    /// Returns a copy with `other` merged in.
    pub fn merged(&self, other: &LocalParams) -> LocalParams {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<LocalValue> {
        self.entries.shift_remove(key)
    }

    /// Returns a copy without `key`.
    pub fn without(&self, key: &str) -> LocalParams {
        let mut copy = self.clone();
        copy.remove(key);
        copy
    }

    pub fn get(&self, key: &str) -> Option<&LocalValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LocalValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Renders the params followed by `body`.
    pub fn prefix(&self, body: &str) -> String {
        format!("{}{}", self, body)
    }
}

impl fmt::Display for LocalParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        f.write_str("{!")?;
        let mut first = true;
        if let Some(kind) = &self.kind {
            f.write_str(kind)?;
            first = false;
        }
        for (key, value) in &self.entries {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        f.write_str("}")
    }
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}
