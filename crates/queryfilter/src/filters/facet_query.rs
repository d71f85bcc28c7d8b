use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use solar_query::{Component, Expr, FacetQuery, FilterQuery, LocalParams, SearchResults, Value};

use super::{Compiled, exact_values, facet_local_params};
use crate::codec::Criterion;
use crate::error::DeclarationError;
use crate::value::FilterValue;

/// One named query of a [`FacetQueryFilter`].
#[derive(Debug, Clone, PartialEq)]
pub struct FacetQueryValue {
    pub value: String,
    /// `None` when the local params carry the whole query, e.g. `{!geofilt}`.
    pub expr: Option<Expr>,
    pub local_params: LocalParams,
    pub title: Option<String>,
    /// Extra display data copied onto the reconciled value.
    pub opts: IndexMap<String, JsonValue>,
}

impl FacetQueryValue {
    pub fn new(value: impl Into<String>, expr: Option<Expr>) -> Self {
        Self {
            value: value.into(),
            expr,
            local_params: LocalParams::new(),
            title: None,
            opts: IndexMap::new(),
        }
    }

    pub fn with_local_params(mut self, local_params: LocalParams) -> Self {
        self.local_params = local_params;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.opts.insert(key.into(), value.into());
        self
    }

    fn body(&self) -> String {
        self.expr.as_ref().map(Expr::to_string).unwrap_or_default()
    }

    /// Local params for the filter query: own params without exclusions.
    fn filter_local_params(&self) -> LocalParams {
        self.local_params.without("ex")
    }
}

/// A facet made of named queries, one `facet.query` per value.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetQueryFilter {
    pub name: String,
    pub values: Vec<FacetQueryValue>,
    pub select_multiple: bool,
}

impl FacetQueryFilter {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = FacetQueryValue>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().collect(),
            select_multiple: true,
        }
    }

    pub fn with_select_multiple(mut self, select_multiple: bool) -> Self {
        self.select_multiple = select_multiple;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), DeclarationError> {
        if self.values.is_empty() {
            return Err(DeclarationError::NoFacetQueryValues {
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
        Ok(())
    }

    /// Response key of a value's count.
    pub fn key(&self, value: &str) -> String {
        format!("{}__{}", self.name, value)
    }

    /// Declared values selected by the request, in declaration order.
    /// Unknown names are ignored; a single-select filter keeps the last
    /// accepted one.
    fn selected(&self, criteria: &[Criterion]) -> Vec<&FacetQueryValue> {
        let accepted: Vec<&FacetQueryValue> = exact_values(criteria, true)
            .iter()
            .map(Value::to_string)
            .filter_map(|name| self.values.iter().find(|value| value.value == name))
            .collect();
        if !self.select_multiple {
            return accepted.last().copied().into_iter().collect();
        }
        self.values
            .iter()
            .filter(|value| accepted.iter().any(|selected| selected.value == value.value))
            .collect()
    }

    pub(crate) fn compile(&self, criteria: &[Criterion]) -> Compiled {
        let components = self
            .values
            .iter()
            .map(|value| {
                let local_params = facet_local_params(&value.local_params, &self.key(&value.value), &self.name);
                Component::FacetQuery(FacetQuery::new(value.expr.clone(), local_params))
            })
            .collect();

        let filters = match self.selected(criteria).as_slice() {
            [] => Vec::new(),
            [only] => {
                let mut local_params = only.filter_local_params();
                local_params.add("tag", self.name.as_str());
                vec![FilterQuery::new(
                    only.expr.clone().unwrap_or_else(|| Expr::raw("")),
                    local_params,
                )]
            }
            many => {
                let exprs = many.iter().map(|value| {
                    let local_params = value.filter_local_params();
                    match &value.expr {
                        Some(expr) if local_params.is_empty() => expr.clone(),
                        _ => nested_query(&local_params.prefix(&value.body())),
                    }
                });
                vec![FilterQuery::new(
                    Expr::or(exprs),
                    LocalParams::new().with("tag", self.name.as_str()),
                )]
            }
        };

        Compiled { filters, components }
    }

    pub(crate) fn reconcile(&self, criteria: &[Criterion], results: &SearchResults) -> Vec<FilterValue> {
        let selected: Vec<&str> = self
            .selected(criteria)
            .iter()
            .map(|value| value.value.as_str())
            .collect();
        self.values
            .iter()
            .map(|declared| {
                let count = results.facet_query(&self.key(&declared.value));
                let is_selected = selected.contains(&declared.value.as_str());
                FilterValue::new(
                    &self.name,
                    Value::Text(declared.value.clone()),
                    &declared.value,
                    count,
                    is_selected,
                )
                .with_title(declared.title.clone().unwrap_or_else(|| declared.value.clone()))
                .with_opts(declared.opts.clone())
            })
            .collect()
    }
}

/// Wraps a query carrying its own local params so it can be OR-ed.
fn nested_query(query: &str) -> Expr {
    Expr::raw(format!(
        "_query_:\"{}\"",
        query.replace('\\', "\\\\").replace('"', "\\\"")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distances() -> FacetQueryFilter {
        FacetQueryFilter::new(
            "dist",
            [5, 10, 20].map(|d| {
                FacetQueryValue::new(format!("d{}", d), None).with_local_params(
                    LocalParams::of_type("geofilt")
                        .with("d", d)
                        .with("tag", format!("d{}", d)),
                )
            }),
        )
    }

    #[test]
    fn test_compile_facet_queries() {
        let compiled = distances().compile(&[]);
        assert!(compiled.filters.is_empty());
        let rendered: Vec<String> = compiled
            .components
            .iter()
            .map(|component| match component {
                Component::FacetQuery(facet) => facet.local_params.prefix(""),
                other => panic!("unexpected component {:?}", other),
            })
            .collect();
        assert_eq!(rendered[0], "{!geofilt d=5 tag=d5 key=dist__d5 ex=dist}");
    }

    #[test]
    fn test_single_selection_without_expression() {
        let compiled = distances().compile(&[Criterion::exact("d10"), Criterion::exact("d99")]);
        assert_eq!(compiled.filters[0].to_string(), "{!geofilt d=10 tag=d10,dist}");
    }

    #[test]
    fn test_multiple_selections_are_nested() {
        let filter = FacetQueryFilter::new(
            "date",
            [
                FacetQueryValue::new("today", Some(Expr::gte("date", "NOW/DAY"))),
                FacetQueryValue::new("near", None)
                    .with_local_params(LocalParams::of_type("geofilt").with("d", 5)),
            ],
        );
        let compiled = filter.compile(&[Criterion::exact("today"), Criterion::exact("near")]);
        assert_eq!(
            compiled.filters[0].to_string(),
            "{!tag=date}(date:[NOW/DAY TO *] OR _query_:\"{!geofilt d=5}\")"
        );

        let single = filter
            .with_select_multiple(false)
            .compile(&[Criterion::exact("today"), Criterion::exact("near")]);
        assert_eq!(single.filters[0].to_string(), "{!geofilt d=5 tag=date}");
    }

    #[test]
    fn test_single_select_keeps_last_known_value() {
        let filter = FacetQueryFilter::new(
            "dist",
            [
                FacetQueryValue::new("d5", Some(Expr::lte("dist", 5))),
                FacetQueryValue::new("d10", Some(Expr::lte("dist", 10))),
            ],
        )
        .with_select_multiple(false);
        let criteria = [Criterion::exact("d10"), Criterion::exact("bogus")];

        let compiled = filter.compile(&criteria);
        let rendered: Vec<String> = compiled.filters.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["{!tag=dist}dist:[* TO 10]"]);
    }

    #[test]
    fn test_validate() {
        let empty = FacetQueryFilter::new("dist", Vec::new());
        assert!(matches!(
            empty.validate(),
            Err(DeclarationError::NoFacetQueryValues { .. })
        ));
        let duplicate = FacetQueryFilter::new(
            "dist",
            [FacetQueryValue::new("d5", None), FacetQueryValue::new("d5", None)],
        );
        assert!(matches!(
            duplicate.validate(),
            Err(DeclarationError::DuplicateValue { .. })
        ));
        assert!(distances().validate().is_ok());
    }
}
