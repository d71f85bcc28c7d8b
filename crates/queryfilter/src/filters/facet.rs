use solar_query::{
    Component, Expr, FacetField, FacetOptions, FieldType, FilterQuery, InstanceMapper, LocalParams,
    SearchResults,
};
use solar_query::results::flat_pairs;

use super::{Compiled, exact_values, facet_local_params, tagged};
use crate::codec::Criterion;
use crate::reconcile::{Bucket, Level, decorate, facet_values};
use crate::value::{FilterValue, Mapper, TitleFn};

/// A multi-select field facet.
///
/// The facet excludes the filter's own tag, so counts for unselected values
/// are computed as if this filter were not applied.
#[derive(Debug, Clone)]
pub struct FacetFilter {
    pub name: String,
    pub field: String,
    pub value_type: FieldType,
    pub local_params: LocalParams,
    pub options: FacetOptions,
    pub select_multiple: bool,
    /// Lists selected values the engine did not return.
    pub ensure_selected_values: bool,
    pub instance_mapper: Option<Mapper>,
    pub title: Option<TitleFn>,
}

impl FacetFilter {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            value_type: FieldType::Text,
            local_params: LocalParams::new(),
            options: FacetOptions::default(),
            select_multiple: true,
            ensure_selected_values: false,
            instance_mapper: None,
            title: None,
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

    pub fn with_options(mut self, options: FacetOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_select_multiple(mut self, select_multiple: bool) -> Self {
        self.select_multiple = select_multiple;
        self
    }

    pub fn with_ensure_selected_values(mut self, ensure: bool) -> Self {
        self.ensure_selected_values = ensure;
        self
    }

    pub fn with_instance_mapper(mut self, mapper: impl InstanceMapper + 'static) -> Self {
        self.instance_mapper = Some(Mapper::new(mapper));
        self
    }

    pub fn with_title(mut self, title: impl Fn(&FilterValue) -> String + Send + Sync + 'static) -> Self {
        self.title = Some(TitleFn::new(title));
        self
    }

    fn level(&self) -> Level<'_> {
        Level {
            value_type: self.value_type,
            ensure_selected_values: self.ensure_selected_values,
            instance_mapper: self.instance_mapper.as_ref(),
            title: self.title.as_ref(),
        }
    }

    pub(crate) fn compile(&self, criteria: &[Criterion]) -> Compiled {
        let facet = FacetField::new(&self.field)
            .with_local_params(facet_local_params(&self.local_params, &self.name, &self.name))
            .with_type(self.value_type)
            .with_options(self.options.clone());

        let selected = exact_values(criteria, self.select_multiple);
        let filters = if selected.is_empty() {
            Vec::new()
        } else {
            vec![FilterQuery::new(
                Expr::any_of(&self.field, selected),
                tagged(&self.local_params, &self.name),
            )]
        };

        Compiled {
            filters,
            components: vec![Component::FacetField(facet)],
        }
    }

    pub(crate) fn reconcile(&self, criteria: &[Criterion], results: &SearchResults) -> Vec<FilterValue> {
        let selected = exact_values(criteria, self.select_multiple);
        let buckets: Vec<Bucket<'_>> = results
            .facet_counts()
            .and_then(|counts| counts.facet_fields.get(&self.name))
            .map(|pairs| flat_pairs(pairs).map(|(raw, count)| Bucket::flat(raw, count)).collect())
            .unwrap_or_default();

        let level = self.level();
        let mut values: Vec<FilterValue> = facet_values(&self.name, &level, buckets, &selected, None)
            .into_iter()
            .map(|(value, _)| value)
            .collect();
        let mut refs: Vec<&mut FilterValue> = values.iter_mut().collect();
        decorate(&mut refs, &level);
        values
    }
}
