//! Reconciled filter values.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use solar_query::{InstanceMapper, Value};

/// One selectable value of a filter after reconciliation with a response.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterValue {
    pub filter_name: String,
    pub value: Value,
    /// Request token selecting this value. Pivot values carry the whole
    /// path, e.g. `samsung:note`.
    pub filter_value: String,
    /// `None` when the engine returned no count.
    pub count: Option<u64>,
    /// Display count: `+N` for unselected values, `N` for selected ones and
    /// empty without a count.
    pub count_plus: String,
    pub selected: bool,
    pub title: String,
    pub instance: Option<JsonValue>,
    /// Child values of a pivot level. `None` below the last level or when the
    /// engine returned no children.
    pub pivot: Option<Vec<FilterValue>>,
    pub opts: IndexMap<String, JsonValue>,
}

impl FilterValue {
    pub fn new(
        filter_name: impl Into<String>,
        value: Value,
        filter_value: impl Into<String>,
        count: Option<u64>,
        selected: bool,
    ) -> Self {
        Self {
            filter_name: filter_name.into(),
            title: value.to_string(),
            value,
            filter_value: filter_value.into(),
            count,
            count_plus: count_plus(count, selected),
            selected,
            instance: None,
            pivot: None,
            opts: IndexMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_opts(mut self, opts: IndexMap<String, JsonValue>) -> Self {
        self.opts = opts;
        self
    }

    /// Children of a pivot value; empty when there are none.
    pub fn pivot_values(&self) -> &[FilterValue] {
        self.pivot.as_deref().unwrap_or_default()
    }

    /// Child value with the given full `filter_value`.
    pub fn get_pivot_value(&self, filter_value: &str) -> Option<&FilterValue> {
        self.pivot_values()
            .iter()
            .find(|child| child.filter_value == filter_value)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Formats a display count.
pub fn count_plus(count: Option<u64>, selected: bool) -> String {
    match (count, selected) {
        (None, _) => String::new(),
        (Some(count), true) => count.to_string(),
        (Some(count), false) => format!("+{}", count),
    }
}

/// Computes the display title of a value.
#[derive(Clone)]
pub struct TitleFn(Arc<dyn Fn(&FilterValue) -> String + Send + Sync>);

impl TitleFn {
    pub fn new(f: impl Fn(&FilterValue) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn title(&self, value: &FilterValue) -> String {
        (self.0)(value)
    }
}

impl fmt::Debug for TitleFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TitleFn")
    }
}

/// A shared instance mapper attached to a filter or pivot level.
#[derive(Clone)]
pub struct Mapper(Arc<dyn InstanceMapper>);

impl Mapper {
    pub fn new(mapper: impl InstanceMapper + 'static) -> Self {
        Self(Arc::new(mapper))
    }

    pub fn from_arc(mapper: Arc<dyn InstanceMapper>) -> Self {
        Self(mapper)
    }

    pub fn get(&self) -> &dyn InstanceMapper {
        self.0.as_ref()
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mapper")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_plus() {
        assert_eq!(count_plus(Some(18), false), "+18");
        assert_eq!(count_plus(Some(42), true), "42");
        assert_eq!(count_plus(Some(0), false), "+0");
        assert_eq!(count_plus(None, true), "");
        assert_eq!(count_plus(None, false), "");
    }

    #[test]
    fn test_default_title_is_value_text() {
        let value = FilterValue::new("cat", Value::Null, "null", Some(4), true);
        assert_eq!(value.title, "null");
        assert_eq!(value.count_plus, "4");
        assert!(value.pivot_values().is_empty());
    }

    #[test]
    fn test_title_fn() {
        let upper = TitleFn::new(|value: &FilterValue| value.filter_value.to_uppercase());
        let value = FilterValue::new("region", Value::from("kiev"), "kiev", Some(42), true);
        assert_eq!(upper.title(&value), "KIEV");
        assert_eq!(format!("{:?}", upper), "TitleFn");
    }
}
