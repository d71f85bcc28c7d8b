//! Loading filter declarations from JSON.
//!
//! ```json
//! {
//!   "filters": [
//!     {"kind": "facet", "name": "cat", "field": "category", "type": "integer",
//!      "local_params": {"cache": false, "ex": ["test"]}, "options": {"mincount": 1}},
//!     {"kind": "range", "name": "price", "field": "price_unit", "gather_stats": true},
//!     {"kind": "pivot", "name": "manu", "levels": [{"field": "manufacturer"}, {"field": "model"}]},
//!     {"kind": "facet_query", "name": "dist", "values": [
//!       {"value": "d5", "local_params": {"type": "geofilt", "d": 5}}
//!     ]}
//!   ],
//!   "ordering": {"name": "sort", "default": "-score",
//!                "values": [{"value": "-score", "fields": ["-score"]}]}
//! }
//! ```
//!
//! Instance mappers and title functions cannot be declared in JSON; attach
//! them programmatically.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use solar_query::{Expr, FacetOptions, FieldType, LocalParams, LocalValue};
use tracing::debug;

use crate::error::{DeclarationError, DeclarationFileError};
use crate::filters::{
    FacetFilter, FacetQueryFilter, FacetQueryValue, Filter, FilterSpec, OrderingFilter,
    OrderingValue, PivotFilter, PivotLevel, RangeFilter,
};
use crate::registry::QueryFilter;

/// Local params as a JSON object. `type` becomes the positional type.
pub type LocalParamsDeclaration = IndexMap<String, JsonValue>;

fn default_true() -> bool {
    true
}

fn default_float() -> FieldType {
    FieldType::Float
}

/// One declared filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum FilterDeclaration {
    Filter {
        name: String,
        field: Option<String>,
        #[serde(rename = "type", default)]
        value_type: FieldType,
        #[serde(default)]
        local_params: LocalParamsDeclaration,
        #[serde(default = "default_true")]
        select_multiple: bool,
    },
    Facet {
        name: String,
        field: Option<String>,
        #[serde(rename = "type", default)]
        value_type: FieldType,
        #[serde(default)]
        local_params: LocalParamsDeclaration,
        #[serde(default)]
        options: FacetOptions,
        #[serde(default = "default_true")]
        select_multiple: bool,
        #[serde(default)]
        ensure_selected_values: bool,
    },
    FacetQuery {
        name: String,
        values: Vec<FacetQueryValueDeclaration>,
        #[serde(default = "default_true")]
        select_multiple: bool,
    },
    Range {
        name: String,
        field: Option<String>,
        #[serde(rename = "type", default = "default_float")]
        value_type: FieldType,
        #[serde(default)]
        local_params: LocalParamsDeclaration,
        #[serde(default)]
        gather_stats: bool,
    },
    Pivot {
        name: String,
        levels: Vec<PivotLevelDeclaration>,
        #[serde(default)]
        local_params: LocalParamsDeclaration,
    },
}

/// One value of a `facet_query` declaration. `query` is raw query syntax.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FacetQueryValueDeclaration {
    pub value: String,
    pub query: Option<String>,
    #[serde(default)]
    pub local_params: LocalParamsDeclaration,
    pub title: Option<String>,
    #[serde(default)]
    pub opts: IndexMap<String, JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PivotLevelDeclaration {
    pub field: String,
    #[serde(rename = "type", default)]
    pub value_type: FieldType,
    #[serde(default)]
    pub options: FacetOptions,
    #[serde(default)]
    pub ensure_selected_values: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderingDeclaration {
    pub name: String,
    pub values: Vec<OrderingValueDeclaration>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderingValueDeclaration {
    pub value: String,
    /// Defaults to the value itself.
    #[serde(default)]
    pub fields: Vec<String>,
    pub title: Option<String>,
}

/// A complete declaration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declarations {
    #[serde(default)]
    pub filters: Vec<FilterDeclaration>,
    pub ordering: Option<OrderingDeclaration>,
}

/// Converts a JSON object into local params.
///
/// Arrays become lists, scalars their text form. Nulls are skipped.
pub fn local_params_from_json(declared: &LocalParamsDeclaration) -> LocalParams {
    let mut local_params = LocalParams::new();
    for (key, value) in declared {
        if key == "type" {
            if let Some(kind) = json_text(value) {
                local_params.set_kind(kind);
            }
            continue;
        }
        let value = match value {
            JsonValue::Array(items) => LocalValue::List(items.iter().filter_map(json_text).collect()),
            scalar => match json_text(scalar) {
                Some(text) => LocalValue::Single(text),
                None => continue,
            },
        };
        local_params.add(key, value);
    }
    local_params
}

fn json_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

impl From<FilterDeclaration> for FilterSpec {
    fn from(declaration: FilterDeclaration) -> Self {
        match declaration {
            FilterDeclaration::Filter {
                name,
                field,
                value_type,
                local_params,
                select_multiple,
            } => {
                let field = field.unwrap_or_else(|| name.clone());
                Filter::new(name)
                    .with_field(field)
                    .with_type(value_type)
                    .with_local_params(local_params_from_json(&local_params))
                    .with_select_multiple(select_multiple)
                    .into()
            }
            FilterDeclaration::Facet {
                name,
                field,
                value_type,
                local_params,
                options,
                select_multiple,
                ensure_selected_values,
            } => {
                let field = field.unwrap_or_else(|| name.clone());
                FacetFilter::new(name)
                    .with_field(field)
                    .with_type(value_type)
                    .with_local_params(local_params_from_json(&local_params))
                    .with_options(options)
                    .with_select_multiple(select_multiple)
                    .with_ensure_selected_values(ensure_selected_values)
                    .into()
            }
            FilterDeclaration::FacetQuery {
                name,
                values,
                select_multiple,
            } => {
                let values = values.into_iter().map(|declared| {
                    let mut value = FacetQueryValue::new(declared.value, declared.query.map(Expr::raw))
                        .with_local_params(local_params_from_json(&declared.local_params));
                    value.title = declared.title;
                    value.opts = declared.opts;
                    value
                });
                FacetQueryFilter::new(name, values)
                    .with_select_multiple(select_multiple)
                    .into()
            }
            FilterDeclaration::Range {
                name,
                field,
                value_type,
                local_params,
                gather_stats,
            } => {
                let field = field.unwrap_or_else(|| name.clone());
                RangeFilter::new(name)
                    .with_field(field)
                    .with_type(value_type)
                    .with_local_params(local_params_from_json(&local_params))
                    .with_gather_stats(gather_stats)
                    .into()
            }
            FilterDeclaration::Pivot {
                name,
                levels,
                local_params,
            } => {
                let levels = levels.into_iter().map(|level| {
                    PivotLevel::new(level.field)
                        .with_type(level.value_type)
                        .with_options(level.options)
                        .with_ensure_selected_values(level.ensure_selected_values)
                });
                PivotFilter::new(name, levels)
                    .with_local_params(local_params_from_json(&local_params))
                    .into()
            }
        }
    }
}

impl From<OrderingDeclaration> for OrderingFilter {
    fn from(declaration: OrderingDeclaration) -> Self {
        let values = declaration.values.into_iter().map(|declared| {
            let fields = if declared.fields.is_empty() {
                vec![declared.value.clone()]
            } else {
                declared.fields
            };
            let mut value = OrderingValue::new(declared.value, fields);
            value.title = declared.title;
            value
        });
        let mut ordering = OrderingFilter::new(declaration.name, values);
        ordering.default = declaration.default;
        ordering
    }
}

impl QueryFilter {
    /// Builds a registry from parsed declarations.
    pub fn from_declarations(declarations: Declarations) -> Result<Self, DeclarationError> {
        let mut registry = QueryFilter::new();
        for declaration in declarations.filters {
            registry.add_filter(declaration)?;
        }
        if let Some(ordering) = declarations.ordering {
            registry.add_ordering(ordering.into())?;
        }
        debug!(
            filters = registry.filters().len(),
            ordering = registry.ordering().is_some(),
            "Loaded filter declarations"
        );
        Ok(registry)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DeclarationFileError> {
        let declarations: Declarations = serde_json::from_str(text)?;
        Ok(Self::from_declarations(declarations)?)
    }

    /// Reads declarations from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DeclarationFileError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_local_params_from_json() {
        let declared: LocalParamsDeclaration = serde_json::from_value(json!({
            "type": "geofilt", "d": 5, "ex": ["test", 1], "cache": false, "skip": null
        }))
        .unwrap();
        assert_eq!(
            local_params_from_json(&declared).to_string(),
            "{!geofilt d=5 ex=test,1 cache=false}"
        );
    }

    #[test]
    fn test_from_json_str() {
        let registry = QueryFilter::from_json_str(
            r#"{
                "filters": [
                    {"kind": "facet", "name": "cat", "field": "category", "type": "integer",
                     "local_params": {"cache": false, "ex": ["test"]}, "options": {"mincount": 1}},
                    {"kind": "range", "name": "price", "field": "price_unit", "gather_stats": true},
                    {"kind": "pivot", "name": "manu", "levels": [{"field": "manufacturer"}, {"field": "model"}]},
                    {"kind": "facet_query", "name": "dist", "values": [
                        {"value": "d5", "local_params": {"type": "geofilt", "d": 5}, "title": "5 km"}
                    ]}
                ],
                "ordering": {"name": "sort", "default": "-score",
                             "values": [{"value": "-score"}, {"value": "price", "title": "Cheap first"}]}
            }"#,
        )
        .unwrap();

        assert_eq!(registry.filters().len(), 4);
        match registry.filter("cat") {
            Some(FilterSpec::Facet(facet)) => {
                assert_eq!(facet.field, "category");
                assert_eq!(facet.value_type, FieldType::Integer);
                assert_eq!(facet.options.mincount, Some(1));
            }
            other => panic!("unexpected filter {:?}", other),
        }
        match registry.filter("price") {
            Some(FilterSpec::Range(range)) => assert_eq!(range.value_type, FieldType::Float),
            other => panic!("unexpected filter {:?}", other),
        }
        let ordering = registry.ordering().unwrap();
        assert_eq!(ordering.values[0].fields, vec!["-score"]);
        assert_eq!(ordering.values[1].title(), "Cheap first");
    }

    #[test]
    fn test_invalid_declarations() {
        let err = QueryFilter::from_json_str(r#"{"filters": [{"kind": "pivot", "name": "manu", "levels": []}]}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            DeclarationFileError::Declaration(DeclarationError::NoPivotLevels { .. })
        ));

        let err = QueryFilter::from_json_str(r#"{"filters": [{"kind": "bogus", "name": "x"}]}"#).unwrap_err();
        assert!(matches!(err, DeclarationFileError::Json(_)));
    }
}
