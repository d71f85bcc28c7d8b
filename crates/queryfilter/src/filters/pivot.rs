use solar_query::{
    Component, Expr, FacetOptions, FacetPivot, FieldType, FilterQuery, InstanceMapper, LocalParams,
    PivotField, SearchResults, Value,
};

use super::{Compiled, facet_local_params, tagged};
use crate::codec::{Criterion, Operator, ValueType};
use crate::error::DeclarationError;
use crate::reconcile::{Level, pivot_tree};
use crate::value::{FilterValue, Mapper, TitleFn};

/// One level of a [`PivotFilter`].
#[derive(Debug, Clone)]
pub struct PivotLevel {
    pub field: String,
    pub value_type: FieldType,
    pub options: FacetOptions,
    pub ensure_selected_values: bool,
    pub instance_mapper: Option<Mapper>,
    pub title: Option<TitleFn>,
}

impl PivotLevel {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value_type: FieldType::Text,
            options: FacetOptions::default(),
            ensure_selected_values: false,
            instance_mapper: None,
            title: None,
        }
    }

    pub fn with_type(mut self, value_type: FieldType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_options(mut self, options: FacetOptions) -> Self {
        self.options = options;
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
}

impl From<&str> for PivotLevel {
    fn from(field: &str) -> Self {
        PivotLevel::new(field)
    }
}

/// A hierarchical facet over several fields.
///
/// Request values are colon-separated paths such as `samsung:note`. A path
/// may stop at any level.
#[derive(Debug, Clone)]
pub struct PivotFilter {
    pub name: String,
    pub levels: Vec<PivotLevel>,
    pub local_params: LocalParams,
}

impl PivotFilter {
    pub fn new(name: impl Into<String>, levels: impl IntoIterator<Item = PivotLevel>) -> Self {
        Self {
            name: name.into(),
            levels: levels.into_iter().collect(),
            local_params: LocalParams::new(),
        }
    }

    pub fn with_local_params(mut self, local_params: LocalParams) -> Self {
        self.local_params = local_params;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), DeclarationError> {
        if self.levels.is_empty() {
            return Err(DeclarationError::NoPivotLevels {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn value_type(&self) -> ValueType {
        ValueType::Composite(self.levels.iter().map(|level| level.value_type).collect())
    }

    /// Exact selections truncated to the declared depth.
    fn selections(&self, criteria: &[Criterion]) -> Vec<Vec<Value>> {
        criteria
            .iter()
            .filter(|criterion| criterion.operator == Operator::Exact && !criterion.values.is_empty())
            .map(|criterion| {
                criterion
                    .values
                    .iter()
                    .take(self.levels.len())
                    .cloned()
                    .collect()
            })
            .collect()
    }

    pub(crate) fn compile(&self, criteria: &[Criterion]) -> Compiled {
        let fields = self
            .levels
            .iter()
            .map(|level| PivotField::new(&level.field).with_options(level.options.clone()))
            .collect();
        let facet = FacetPivot::new(fields)
            .with_local_params(facet_local_params(&self.local_params, &self.name, &self.name));

        let selections = self.selections(criteria);
        let filters = if selections.is_empty() {
            Vec::new()
        } else {
            let paths = selections.into_iter().map(|tuple| {
                Expr::and(
                    self.levels
                        .iter()
                        .zip(tuple)
                        .map(|(level, value)| Expr::exact(&level.field, value)),
                )
            });
            vec![FilterQuery::new(Expr::or(paths), tagged(&self.local_params, &self.name))]
        };

        Compiled {
            filters,
            components: vec![Component::FacetPivot(facet)],
        }
    }

    pub(crate) fn reconcile(&self, criteria: &[Criterion], results: &SearchResults) -> Vec<FilterValue> {
        let levels: Vec<Level<'_>> = self.levels.iter().map(PivotLevel::level).collect();
        let nodes = results.facet_pivot(&self.name).unwrap_or_default();
        pivot_tree(&self.name, &levels, nodes, &self.selections(criteria))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manu() -> PivotFilter {
        PivotFilter::new(
            "manu",
            [
                PivotLevel::new("manufacturer").with_options(FacetOptions::new().with_mincount(1)),
                PivotLevel::new("model").with_options(FacetOptions::new().with_limit(5)),
                PivotLevel::new("discount").with_type(FieldType::Boolean),
            ],
        )
    }

    #[test]
    fn test_value_type_is_composite() {
        assert_eq!(
            manu().value_type(),
            ValueType::Composite(vec![FieldType::Text, FieldType::Text, FieldType::Boolean])
        );
    }

    #[test]
    fn test_compile_paths() {
        let criteria = [
            Criterion::new(Operator::Exact, vec![Value::from("samsung"), Value::from("note")]),
            Criterion::new(
                Operator::Exact,
                vec![Value::from("nokia"), Value::from("n900"), Value::Null, Value::from("x")],
            ),
            Criterion::new(Operator::Exact, vec![Value::from("10")]),
            Criterion::new(Operator::Gte, vec![Value::from("100")]),
        ];
        let compiled = manu().compile(&criteria);
        assert_eq!(
            compiled.filters[0].to_string(),
            "{!tag=manu}((manufacturer:\"samsung\" AND model:\"note\") OR \
             (manufacturer:\"nokia\" AND model:\"n900\" AND (*:* NOT discount:[* TO *])) OR \
             manufacturer:\"10\")"
        );
        match &compiled.components[0] {
            Component::FacetPivot(facet) => {
                assert_eq!(facet.local_params.to_string(), "{!key=manu ex=manu}");
                assert_eq!(facet.fields.len(), 3);
            }
            other => panic!("unexpected component {:?}", other),
        }
    }

    #[test]
    fn test_validate_requires_levels() {
        let empty = PivotFilter::new("manu", Vec::new());
        assert_eq!(
            empty.validate(),
            Err(DeclarationError::NoPivotLevels {
                name: "manu".into()
            })
        );
    }
}
