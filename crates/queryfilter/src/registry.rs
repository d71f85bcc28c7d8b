//! The filter registry and its per-request binding.
//!
//! A [`QueryFilter`] is declared once and shared. [`QueryFilter::apply`]
//! decodes one request's raw parameters, derives a new query with every
//! filter applied and returns a [`Binding`] holding that request's state.
//! Bindings are independent: applying the same registry to many requests
//! concurrently is safe, since the registry itself is never mutated.

use solar_query::{SearchQuery, SearchResults, Value};
use tracing::{debug, trace};

use crate::codec::{Criterion, Operator, RawParams, SimpleCodec, TypeSpec, ValueType};
use crate::error::DeclarationError;
use crate::filters::{Direction, FilterSpec, OrderingFilter, OrderingValue, RangeFilter};
use crate::value::FilterValue;

/// Declared filters and at most one ordering.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    filters: Vec<FilterSpec>,
    ordering: Option<OrderingFilter>,
    codec: SimpleCodec,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codec(mut self, codec: SimpleCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Declares a filter. Names must be unique across filters and ordering.
    pub fn add_filter(&mut self, filter: impl Into<FilterSpec>) -> Result<(), DeclarationError> {
        let filter = filter.into();
        filter.validate()?;
        self.check_unique(filter.name())?;
        self.filters.push(filter);
        Ok(())
    }

    pub fn with_filter(mut self, filter: impl Into<FilterSpec>) -> Result<Self, DeclarationError> {
        self.add_filter(filter)?;
        Ok(self)
    }

    /// Declares the ordering filter. Only one is allowed.
    pub fn add_ordering(&mut self, ordering: OrderingFilter) -> Result<(), DeclarationError> {
        ordering.validate()?;
        if let Some(existing) = &self.ordering {
            return Err(DeclarationError::OrderingAlreadyDeclared {
                name: existing.name.clone(),
            });
        }
        self.check_unique(&ordering.name)?;
        self.ordering = Some(ordering);
        Ok(())
    }

    pub fn with_ordering(mut self, ordering: OrderingFilter) -> Result<Self, DeclarationError> {
        self.add_ordering(ordering)?;
        Ok(self)
    }

    fn check_unique(&self, name: &str) -> Result<(), DeclarationError> {
        let taken = self.filters.iter().any(|filter| filter.name() == name)
            || self.ordering.as_ref().is_some_and(|ordering| ordering.name == name);
        if taken {
            return Err(DeclarationError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    pub fn filter(&self, name: &str) -> Option<&FilterSpec> {
        self.filters.iter().find(|filter| filter.name() == name)
    }

    pub fn ordering(&self) -> Option<&OrderingFilter> {
        self.ordering.as_ref()
    }

    pub fn codec(&self) -> &SimpleCodec {
        &self.codec
    }

    /// Decoding types of every declared parameter.
    pub fn type_spec(&self) -> TypeSpec {
        let mut types: TypeSpec = self
            .filters
            .iter()
            .map(|filter| (filter.name().to_string(), filter.value_type()))
            .collect();
        if let Some(ordering) = &self.ordering {
            types.insert(ordering.name.clone(), ValueType::default());
        }
        types
    }

    /// Applies every filter for one request.
    ///
    /// Returns the derived query and the binding used to read the request's
    /// filter state once results are available. `query` is left unchanged.
    pub fn apply<'a>(&'a self, query: &SearchQuery, raw: &RawParams) -> (SearchQuery, Binding<'a>) {
        let mut decoded = self.codec.decode(raw, &self.type_spec());
        let mut query = query.clone();
        let mut filters = Vec::with_capacity(self.filters.len());

        for filter in &self.filters {
            let criteria = decoded.shift_remove(filter.name()).unwrap_or_default();
            let compiled = filter.compile(&criteria);
            debug!(
                filter = filter.name(),
                criteria = criteria.len(),
                filter_queries = compiled.filters.len(),
                components = compiled.components.len(),
                "Applying filter"
            );
            query = compiled.apply_to(&query);
            filters.push(BoundFilter::new(filter, criteria));
        }

        let ordering = self.ordering.as_ref().map(|ordering| {
            let criteria = decoded.shift_remove(&ordering.name).unwrap_or_default();
            let selected = ordering.resolve(&criteria);
            if let Some(value) = selected.map(|index| &ordering.values[index]) {
                debug!(ordering = %ordering.name, value = %value.value, "Applying ordering");
                query = query.order_by(&value.fields);
            }
            BoundOrdering { ordering, selected }
        });

        if !decoded.is_empty() {
            trace!(
                ignored = ?decoded.keys().collect::<Vec<_>>(),
                "Ignoring undeclared parameters"
            );
        }

        (query, Binding { filters, ordering })
    }
}

/// One request's filter state.
#[derive(Debug, Clone)]
pub struct Binding<'a> {
    filters: Vec<BoundFilter<'a>>,
    ordering: Option<BoundOrdering<'a>>,
}

impl<'a> Binding<'a> {
    /// Reconciles every filter with the engine response.
    pub fn process_results(&mut self, results: &SearchResults) {
        for filter in &mut self.filters {
            filter.process_results(results);
        }
    }

    pub fn filters(&self) -> &[BoundFilter<'a>] {
        &self.filters
    }

    pub fn get_filter(&self, name: &str) -> Option<&BoundFilter<'a>> {
        self.filters.iter().find(|filter| filter.name() == name)
    }

    pub fn ordering(&self) -> Option<&BoundOrdering<'a>> {
        self.ordering.as_ref()
    }
}

/// A declared filter with one request's criteria and reconciled values.
#[derive(Debug, Clone)]
pub struct BoundFilter<'a> {
    spec: &'a FilterSpec,
    criteria: Vec<Criterion>,
    all_values: Vec<FilterValue>,
    min: Option<Value>,
    max: Option<Value>,
    processed: bool,
}

impl<'a> BoundFilter<'a> {
    fn new(spec: &'a FilterSpec, criteria: Vec<Criterion>) -> Self {
        Self {
            spec,
            criteria,
            all_values: Vec::new(),
            min: None,
            max: None,
            processed: false,
        }
    }

    fn process_results(&mut self, results: &SearchResults) {
        let reconciled = self.spec.reconcile(&self.criteria, results);
        self.all_values = reconciled.values;
        self.min = reconciled.min;
        self.max = reconciled.max;
        self.processed = true;
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn spec(&self) -> &'a FilterSpec {
        self.spec
    }

    /// Decoded criteria of this request.
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Every reconciled value, selected or not.
    pub fn all_values(&self) -> &[FilterValue] {
        &self.all_values
    }

    /// Unselected values.
    pub fn values(&self) -> Vec<&FilterValue> {
        self.all_values.iter().filter(|value| !value.selected).collect()
    }

    pub fn selected_values(&self) -> Vec<&FilterValue> {
        self.all_values.iter().filter(|value| value.selected).collect()
    }

    /// Top-level value by request token.
    pub fn get_value(&self, filter_value: &str) -> Option<&FilterValue> {
        self.all_values
            .iter()
            .find(|value| value.filter_value == filter_value)
    }

    /// Requested lower bound of a range filter.
    pub fn from_value(&self) -> Option<Value> {
        RangeFilter::bound(&self.criteria, Operator::Gte)
    }

    /// Requested upper bound of a range filter.
    pub fn to_value(&self) -> Option<Value> {
        RangeFilter::bound(&self.criteria, Operator::Lte)
    }

    /// Smallest value available, from field statistics.
    pub fn min(&self) -> Option<&Value> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&Value> {
        self.max.as_ref()
    }
}

/// The ordering filter with one request's selection.
#[derive(Debug, Clone)]
pub struct BoundOrdering<'a> {
    ordering: &'a OrderingFilter,
    selected: Option<usize>,
}

/// One declared sort as seen by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingChoice<'a> {
    pub value: &'a OrderingValue,
    pub selected: bool,
    pub direction: Direction,
}

impl<'a> BoundOrdering<'a> {
    pub fn name(&self) -> &str {
        &self.ordering.name
    }

    fn choice(&self, index: usize) -> OrderingChoice<'a> {
        let value = &self.ordering.values[index];
        OrderingChoice {
            value,
            selected: self.selected == Some(index),
            direction: value.direction(),
        }
    }

    pub fn values(&self) -> Vec<OrderingChoice<'a>> {
        (0..self.ordering.values.len()).map(|index| self.choice(index)).collect()
    }

    pub fn get_value(&self, value: &str) -> Option<OrderingChoice<'a>> {
        self.ordering
            .values
            .iter()
            .position(|declared| declared.value == value)
            .map(|index| self.choice(index))
    }

    pub fn selected_value(&self) -> Option<OrderingChoice<'a>> {
        self.selected.map(|index| self.choice(index))
    }
}
