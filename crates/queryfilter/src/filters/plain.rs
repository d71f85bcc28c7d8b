use solar_query::{Expr, FieldType, FilterQuery, LocalParams};

use super::{Compiled, exact_values, tagged};
use crate::codec::{Criterion, Operator};
use crate::value::FilterValue;

/// Filters a field by the requested values without faceting it.
///
/// Exact values are OR-ed into one tagged filter query; each `__gte` and
/// `__lte` bound adds its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub field: String,
    pub value_type: FieldType,
    pub local_params: LocalParams,
    pub select_multiple: bool,
}

impl Filter {
    /// A filter on the field of the same name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            value_type: FieldType::Text,
            local_params: LocalParams::new(),
            select_multiple: true,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_type(mut self, value_type: FieldType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_local_params(mut self, local_params: LocalParams) -> Self {
        self.local_params = local_params;
        self
    }

    pub fn with_select_multiple(mut self, select_multiple: bool) -> Self {
        self.select_multiple = select_multiple;
        self
    }

    pub(crate) fn compile(&self, criteria: &[Criterion]) -> Compiled {
        let local_params = tagged(&self.local_params, &self.name);
        let mut filters = Vec::new();

        let selected = exact_values(criteria, self.select_multiple);
        if !selected.is_empty() {
            filters.push(FilterQuery::new(
                Expr::any_of(&self.field, selected),
                local_params.clone(),
            ));
        }
        for criterion in criteria {
            let expr = match (criterion.operator, criterion.value()) {
                (Operator::Gte, Some(value)) if !value.is_null() => Expr::gte(&self.field, value.clone()),
                (Operator::Lte, Some(value)) if !value.is_null() => Expr::lte(&self.field, value.clone()),
                _ => continue,
            };
            filters.push(FilterQuery::new(expr, local_params.clone()));
        }

        Compiled {
            filters,
            components: Vec::new(),
        }
    }

    /// Selected values; the engine reports no counts for a plain filter.
    pub(crate) fn reconcile(&self, criteria: &[Criterion]) -> Vec<FilterValue> {
        exact_values(criteria, self.select_multiple)
            .into_iter()
            .map(|value| {
                let filter_value = value.to_string();
                FilterValue::new(&self.name, value, filter_value, None, true)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solar_query::Value;

    #[test]
    fn test_compile_ors_exact_values() {
        let filter = Filter::new("country").with_local_params(LocalParams::new().with("tag", "cc"));
        let compiled = filter.compile(&[Criterion::exact("us"), Criterion::exact("ru")]);
        assert_eq!(compiled.filters.len(), 1);
        assert_eq!(
            compiled.filters[0].to_string(),
            "{!tag=cc,country}(country:\"us\" OR country:\"ru\")"
        );
        assert!(compiled.components.is_empty());
    }

    #[test]
    fn test_compile_bounds() {
        let filter = Filter::new("year").with_field("year_i").with_type(FieldType::Integer);
        let compiled = filter.compile(&[
            Criterion::new(Operator::Gte, vec![Value::Int(2000)]),
            Criterion::new(Operator::Lte, vec![Value::Null]),
        ]);
        assert_eq!(compiled.filters.len(), 1);
        assert_eq!(compiled.filters[0].to_string(), "{!tag=year}year_i:[2000 TO *]");
    }

    #[test]
    fn test_no_criteria_no_filters() {
        assert_eq!(Filter::new("country").compile(&[]), Compiled::default());
    }

    #[test]
    fn test_reconcile_lists_selection() {
        let filter = Filter::new("country").with_select_multiple(false);
        let values = filter.reconcile(&[Criterion::exact("us"), Criterion::exact("ru")]);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].filter_value, "ru");
        assert!(values[0].selected);
        assert_eq!(values[0].count_plus, "");
    }
}
