//! Filter declarations.
//!
//! Each filter kind turns decoded criteria into filter queries and facet
//! components, and reconciles the engine response into [`FilterValue`]s.
//!
//! | Kind | Request | Engine parameters |
//! |------|---------|-------------------|
//! | [`Filter`] | `country=us` | `fq={!tag=country}country:"us"` |
//! | [`FacetFilter`] | `cat=5` | `facet.field`, tagged `fq` |
//! | [`FacetQueryFilter`] | `date_created=today` | one `facet.query` per value |
//! | [`RangeFilter`] | `price__gte=100` | `fq=price:[100.0 TO *]`, optional `stats.field` |
//! | [`PivotFilter`] | `manu=samsung:note` | `facet.pivot`, tagged `fq` |
//! | [`OrderingFilter`] | `sort=-price` | `sort=price desc` |

mod facet;
mod facet_query;
mod ordering;
mod pivot;
mod plain;
mod range;

pub use facet::FacetFilter;
pub use facet_query::{FacetQueryFilter, FacetQueryValue};
pub use ordering::{Direction, OrderingFilter, OrderingValue};
pub use pivot::{PivotFilter, PivotLevel};
pub use plain::Filter;
pub use range::RangeFilter;

use solar_query::{Component, FilterQuery, LocalParams, SearchQuery, SearchResults, Value};

use crate::codec::{Criterion, Operator, ValueType};
use crate::error::DeclarationError;
use crate::value::FilterValue;

/// Filter queries and components produced by one filter for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compiled {
    pub filters: Vec<FilterQuery>,
    pub components: Vec<Component>,
}

impl Compiled {
    /// Returns a query with every filter and component attached.
    pub fn apply_to(&self, query: &SearchQuery) -> SearchQuery {
        let query = self.filters.iter().fold(query.clone(), |query, fq| {
            query.filter_with(fq.expr.clone(), fq.local_params.clone())
        });
        self.components
            .iter()
            .fold(query, |query, component| query.with_component(component.clone()))
    }
}

/// Response-side state of one filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub values: Vec<FilterValue>,
    pub min: Option<Value>,
    pub max: Option<Value>,
}

impl From<Vec<FilterValue>> for Reconciled {
    fn from(values: Vec<FilterValue>) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }
}

/// Any declared filter other than the ordering.
#[derive(Debug, Clone)]
pub enum FilterSpec {
    Plain(Filter),
    Facet(FacetFilter),
    FacetQuery(FacetQueryFilter),
    Range(RangeFilter),
    Pivot(PivotFilter),
}

impl FilterSpec {
    /// Request parameter name, also used as tag and facet key.
    pub fn name(&self) -> &str {
        match self {
            FilterSpec::Plain(filter) => &filter.name,
            FilterSpec::Facet(filter) => &filter.name,
            FilterSpec::FacetQuery(filter) => &filter.name,
            FilterSpec::Range(filter) => &filter.name,
            FilterSpec::Pivot(filter) => &filter.name,
        }
    }

    /// Type used to decode this filter's request values.
    pub fn value_type(&self) -> ValueType {
        match self {
            FilterSpec::Plain(filter) => filter.value_type.into(),
            FilterSpec::Facet(filter) => filter.value_type.into(),
            FilterSpec::FacetQuery(_) => ValueType::default(),
            FilterSpec::Range(filter) => filter.value_type.into(),
            FilterSpec::Pivot(filter) => filter.value_type(),
        }
    }

    /// Checks declaration invariants.
    pub fn validate(&self) -> Result<(), DeclarationError> {
        if self.name().is_empty() {
            return Err(DeclarationError::EmptyName);
        }
        match self {
            FilterSpec::FacetQuery(filter) => filter.validate(),
            FilterSpec::Pivot(filter) => filter.validate(),
            _ => Ok(()),
        }
    }

    pub fn compile(&self, criteria: &[Criterion]) -> Compiled {
        match self {
            FilterSpec::Plain(filter) => filter.compile(criteria),
            FilterSpec::Facet(filter) => filter.compile(criteria),
            FilterSpec::FacetQuery(filter) => filter.compile(criteria),
            FilterSpec::Range(filter) => filter.compile(criteria),
            FilterSpec::Pivot(filter) => filter.compile(criteria),
        }
    }

    pub fn reconcile(&self, criteria: &[Criterion], results: &SearchResults) -> Reconciled {
        match self {
            FilterSpec::Plain(filter) => filter.reconcile(criteria).into(),
            FilterSpec::Facet(filter) => filter.reconcile(criteria, results).into(),
            FilterSpec::FacetQuery(filter) => filter.reconcile(criteria, results).into(),
            FilterSpec::Range(filter) => filter.reconcile(results),
            FilterSpec::Pivot(filter) => filter.reconcile(criteria, results).into(),
        }
    }
}

impl From<Filter> for FilterSpec {
    fn from(filter: Filter) -> Self {
        FilterSpec::Plain(filter)
    }
}

impl From<FacetFilter> for FilterSpec {
    fn from(filter: FacetFilter) -> Self {
        FilterSpec::Facet(filter)
    }
}

impl From<FacetQueryFilter> for FilterSpec {
    fn from(filter: FacetQueryFilter) -> Self {
        FilterSpec::FacetQuery(filter)
    }
}

impl From<RangeFilter> for FilterSpec {
    fn from(filter: RangeFilter) -> Self {
        FilterSpec::Range(filter)
    }
}

impl From<PivotFilter> for FilterSpec {
    fn from(filter: PivotFilter) -> Self {
        FilterSpec::Pivot(filter)
    }
}

/// Values of the exact criteria, first value of each.
///
/// With `select_multiple` off only the last one is kept.
pub(crate) fn exact_values(criteria: &[Criterion], select_multiple: bool) -> Vec<Value> {
    let mut values: Vec<Value> = criteria
        .iter()
        .filter(|criterion| criterion.operator == Operator::Exact)
        .filter_map(|criterion| criterion.value().cloned())
        .collect();
    if !select_multiple && values.len() > 1 {
        values.drain(..values.len() - 1);
    }
    values
}

/// Declared local params with this filter's tag added.
pub(crate) fn tagged(local_params: &LocalParams, name: &str) -> LocalParams {
    let mut local_params = local_params.clone();
    local_params.add("tag", name);
    local_params
}

/// Declared local params keyed by `key` and excluding the filter's own tag.
pub(crate) fn facet_local_params(local_params: &LocalParams, key: &str, name: &str) -> LocalParams {
    let mut local_params = local_params.clone();
    local_params.set("key", key);
    local_params.add("ex", name);
    local_params
}
