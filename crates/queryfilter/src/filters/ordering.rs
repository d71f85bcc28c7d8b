use std::collections::HashSet;
use std::fmt;

use crate::codec::Criterion;
use crate::error::DeclarationError;

use super::exact_values;

/// Sort direction of an ordering value, taken from its first field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "asc"),
            Direction::Desc => write!(f, "desc"),
        }
    }
}

/// A named sort. Fields prefixed with `-` sort descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingValue {
    pub value: String,
    pub fields: Vec<String>,
    pub title: Option<String>,
}

impl OrderingValue {
    pub fn new<S: Into<String>>(value: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            value: value.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            title: None,
        }
    }

    /// A value whose name is its single sort field, e.g. `-price`.
    pub fn field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(field.clone(), [field])
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn direction(&self) -> Direction {
        match self.fields.first() {
            Some(field) if field.starts_with('-') => Direction::Desc,
            _ => Direction::Asc,
        }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.value)
    }
}

/// Maps a request parameter to one of the declared sorts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingFilter {
    pub name: String,
    pub values: Vec<OrderingValue>,
    /// Used when the request selects no declared value.
    pub default: Option<String>,
}

impl OrderingFilter {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = OrderingValue>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().collect(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn validate(&self) -> Result<(), DeclarationError> {
        if self.name.is_empty() {
            return Err(DeclarationError::EmptyName);
        }
        if self.values.is_empty() {
            return Err(DeclarationError::NoOrderingValues {
                name: self.name.clone(),
            });
        }
        let mut seen = HashSet::new();
        for value in &self.values {
            if !seen.insert(value.value.as_str()) {
                return Err(DeclarationError::DuplicateValue {
                    filter: self.name.clone(),
                    value: value.value.clone(),
                });
            }
        }
        if let Some(default) = &self.default {
            if self.get(default).is_none() {
                return Err(DeclarationError::UnknownDefault {
                    filter: self.name.clone(),
                    value: default.clone(),
                });
            }
        }
        Ok(())
    }

    /// Declared value by name.
    pub fn get(&self, value: &str) -> Option<&OrderingValue> {
        self.values.iter().find(|declared| declared.value == value)
    }

    /// Index of the selected value: the last requested declared value, else
    /// the default.
    pub fn resolve(&self, criteria: &[Criterion]) -> Option<usize> {
        let position = |name: &str| self.values.iter().position(|declared| declared.value == name);
        exact_values(criteria, true)
            .iter()
            .rev()
            .find_map(|value| position(&value.to_string()))
            .or_else(|| self.default.as_deref().and_then(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sort() -> OrderingFilter {
        OrderingFilter::new(
            "sort",
            [
                OrderingValue::new("-score", ["-score"]),
                OrderingValue::field("price"),
                OrderingValue::field("-price").with_title("Expensive first"),
            ],
        )
        .with_default("-score")
    }

    #[test]
    fn test_resolve_last_declared_wins() {
        let filter = sort();
        let criteria = [
            Criterion::exact("price"),
            Criterion::exact("-price"),
            Criterion::exact("unknown"),
        ];
        assert_eq!(filter.resolve(&criteria), Some(2));
        assert_eq!(filter.resolve(&[]), Some(0));
        assert_eq!(
            OrderingFilter::new("sort", [OrderingValue::field("price")]).resolve(&[]),
            None
        );
    }

    #[test]
    fn test_direction_and_title() {
        let filter = sort();
        assert_eq!(filter.values[2].direction(), Direction::Desc);
        assert_eq!(filter.values[1].direction(), Direction::Asc);
        assert_eq!(filter.values[2].title(), "Expensive first");
        assert_eq!(filter.values[1].title(), "price");
    }

    #[test]
    fn test_validate() {
        assert!(sort().validate().is_ok());
        assert_eq!(
            sort().with_default("name").validate(),
            Err(DeclarationError::UnknownDefault {
                filter: "sort".into(),
                value: "name".into()
            })
        );
        assert!(matches!(
            OrderingFilter::new("sort", Vec::new()).validate(),
            Err(DeclarationError::NoOrderingValues { .. })
        ));
    }
}
