use serde_json::Value as JsonValue;
use solar_query::{Component, Expr, FieldType, FilterQuery, LocalParams, SearchResults, StatsField, Value};

use super::{Compiled, Reconciled, tagged};
use crate::codec::{Criterion, Operator};

/// Filters a numeric or date field by `__gte` and `__lte` bounds.
///
/// Exact values are ignored. Only the first valid bound of each side is used.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub name: String,
    pub field: String,
    pub value_type: FieldType,
    pub local_params: LocalParams,
    /// Requests field statistics to report the available min and max.
    pub gather_stats: bool,
}

impl RangeFilter {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            value_type: FieldType::Float,
            local_params: LocalParams::new(),
            gather_stats: false,
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

    pub fn with_gather_stats(mut self, gather_stats: bool) -> Self {
        self.gather_stats = gather_stats;
        self
    }

    /// First non-null value of the given operator.
    pub fn bound(criteria: &[Criterion], operator: Operator) -> Option<Value> {
        criteria
            .iter()
            .filter(|criterion| criterion.operator == operator)
            .filter_map(Criterion::value)
            .find(|value| !value.is_null())
            .cloned()
    }

    pub(crate) fn compile(&self, criteria: &[Criterion]) -> Compiled {
        let local_params = tagged(&self.local_params, &self.name);
        let mut filters = Vec::new();
        if let Some(from) = Self::bound(criteria, Operator::Gte) {
            filters.push(FilterQuery::new(Expr::gte(&self.field, from), local_params.clone()));
        }
        if let Some(to) = Self::bound(criteria, Operator::Lte) {
            filters.push(FilterQuery::new(Expr::lte(&self.field, to), local_params));
        }

        let components = if self.gather_stats {
            let stats = StatsField::new(&self.field).with_local_params(LocalParams::new().with("ex", self.name.as_str()));
            vec![Component::Stats(stats)]
        } else {
            Vec::new()
        };
        Compiled { filters, components }
    }

    pub(crate) fn reconcile(&self, results: &SearchResults) -> Reconciled {
        let Some(stats) = results.stats_field(&self.field) else {
            return Reconciled::default();
        };
        let parse = |raw: &JsonValue| self.value_type.parse_json(raw).filter(|value| !value.is_null());
        Reconciled {
            values: Vec::new(),
            min: parse(&stats.min),
            max: parse(&stats.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_bounds_and_stats() {
        let filter = RangeFilter::new("price")
            .with_field("price_unit")
            .with_gather_stats(true)
            .with_local_params(LocalParams::new().with("cache", false));
        let criteria = [
            Criterion::new(Operator::Gte, vec![Value::Float(100.0)]),
            Criterion::new(Operator::Lte, vec![Value::Float(200.0)]),
            Criterion::new(Operator::Lte, vec![Value::Float(300.0)]),
            Criterion::exact(66.0),
        ];
        let compiled = filter.compile(&criteria);
        let fqs: Vec<String> = compiled.filters.iter().map(ToString::to_string).collect();
        assert_eq!(
            fqs,
            vec![
                "{!cache=false tag=price}price_unit:[100.0 TO *]",
                "{!cache=false tag=price}price_unit:[* TO 200.0]",
            ]
        );
        match &compiled.components[0] {
            Component::Stats(stats) => {
                assert_eq!(stats.field, "price_unit");
                assert_eq!(stats.local_params.to_string(), "{!ex=price}");
            }
            other => panic!("unexpected component {:?}", other),
        }
    }

    #[test]
    fn test_bound_skips_null() {
        let criteria = [
            Criterion::new(Operator::Gte, vec![Value::Null]),
            Criterion::new(Operator::Gte, vec![Value::Int(3)]),
        ];
        assert_eq!(RangeFilter::bound(&criteria, Operator::Gte), Some(Value::Int(3)));
        assert_eq!(RangeFilter::bound(&criteria, Operator::Lte), None);
    }
}
