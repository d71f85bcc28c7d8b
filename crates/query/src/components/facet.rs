//! Faceting components: field, query, range and pivot facets.

use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::local_params::LocalParams;
use crate::params::{ParamValue, WireParams, merge_param};
use crate::value::{FieldType, Value};

/// Per-field facet options, emitted as `f.<field>.facet.<option>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FacetOptions {
    /// Maximum number of buckets; negative means unlimited.
    pub limit: Option<i64>,
    pub offset: Option<u64>,
    pub mincount: Option<u64>,
    /// `count` or `index`.
    pub sort: Option<String>,
    pub prefix: Option<String>,
    /// Also count documents without a value.
    pub missing: Option<bool>,
    /// `enum`, `fc` or `fcs`.
    pub method: Option<String>,
}

impl FacetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_mincount(mut self, mincount: u64) -> Self {
        self.mincount = Some(mincount);
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_missing(mut self, missing: bool) -> Self {
        self.missing = Some(missing);
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Returns the set options as `(name, value)` pairs, named `<prefix>.<option>`.
    pub fn params_with_prefix(&self, prefix: &str) -> Vec<(String, ParamValue)> {
        let mut params = Vec::new();
        let mut push = |name: &str, value: ParamValue| {
            params.push((format!("{}.{}", prefix, name), value));
        };
        if let Some(limit) = self.limit {
            push("limit", limit.into());
        }
        if let Some(offset) = self.offset {
            push("offset", ParamValue::Int(offset as i64));
        }
        if let Some(mincount) = self.mincount {
            push("mincount", ParamValue::Int(mincount as i64));
        }
        if let Some(sort) = &self.sort {
            push("sort", sort.as_str().into());
        }
        if let Some(value_prefix) = &self.prefix {
            push("prefix", value_prefix.as_str().into());
        }
        if let Some(missing) = self.missing {
            push("missing", missing.into());
        }
        if let Some(method) = &self.method {
            push("method", method.as_str().into());
        }
        params
    }

    /// Options scoped to one field: `f.<field>.facet.<option>`.
    pub fn params_for(&self, field: &str) -> Vec<(String, ParamValue)> {
        self.params_with_prefix(&format!("f.{}.facet", field))
    }

    /// Options applied to every facet: `facet.<option>`.
    pub fn global_params(&self) -> Vec<(String, ParamValue)> {
        self.params_with_prefix("facet")
    }
}

/// Returns the response key of a facet: its `key` local param or the field.
fn response_key(local_params: &LocalParams, field: &str) -> String {
    local_params
        .get("key")
        .map(|key| key.items().join(","))
        .unwrap_or_else(|| field.to_string())
}

/// A `facet.field` facet.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetField {
    pub field: String,
    pub local_params: LocalParams,
    /// Type of the bucket values in the response.
    pub value_type: FieldType,
    pub options: FacetOptions,
}

impl FacetField {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            local_params: LocalParams::new(),
            value_type: FieldType::Text,
            options: FacetOptions::default(),
        }
    }

    pub fn with_local_params(mut self, local_params: LocalParams) -> Self {
        self.local_params = local_params;
        self
    }

    pub fn with_type(mut self, value_type: FieldType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_options(mut self, options: FacetOptions) -> Self {
        self.options = options;
        self
    }

    /// Key under which the engine reports the counts.
    pub fn key(&self) -> String {
        response_key(&self.local_params, &self.field)
    }

    pub fn write_params(&self, params: &mut WireParams) {
        merge_param(params, "facet", true.into());
        merge_param(
            params,
            "facet.field",
            ParamValue::Multi(vec![self.local_params.prefix(&self.field)]),
        );
        for (name, value) in self.options.params_for(&self.field) {
            merge_param(params, &name, value);
        }
    }
}

impl From<&str> for FacetField {
    fn from(field: &str) -> Self {
        FacetField::new(field)
    }
}

impl From<String> for FacetField {
    fn from(field: String) -> Self {
        FacetField::new(field)
    }
}

/// A `facet.query` facet. The expression may be absent when the local params
/// carry the whole query, as in `{!geofilt d=5}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetQuery {
    pub expr: Option<Expr>,
    pub local_params: LocalParams,
}

impl FacetQuery {
    pub fn new(expr: Option<Expr>, local_params: LocalParams) -> Self {
        Self { expr, local_params }
    }

    /// Key under which the engine reports the count.
    pub fn key(&self) -> String {
        let body = self.body();
        response_key(&self.local_params, &body)
    }

    fn body(&self) -> String {
        self.expr.as_ref().map(Expr::to_string).unwrap_or_default()
    }

    pub fn write_params(&self, params: &mut WireParams) {
        merge_param(params, "facet", true.into());
        merge_param(
            params,
            "facet.query",
            ParamValue::Multi(vec![self.local_params.prefix(&self.body())]),
        );
    }
}

/// A `facet.range` facet.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetRange {
    pub field: String,
    pub start: Value,
    pub end: Value,
    /// Bucket width; date math such as `+1DAY` is accepted.
    pub gap: String,
    pub hardend: Option<bool>,
    /// `before`, `after`, `between`, `none` or `all`.
    pub other: Vec<String>,
    /// `lower`, `upper`, `edge`, `outer` or `all`.
    pub include: Vec<String>,
    pub local_params: LocalParams,
    pub value_type: FieldType,
}

impl FacetRange {
    pub fn new(
        field: impl Into<String>,
        start: impl Into<Value>,
        end: impl Into<Value>,
        gap: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            start: start.into(),
            end: end.into(),
            gap: gap.into(),
            hardend: None,
            other: Vec::new(),
            include: Vec::new(),
            local_params: LocalParams::new(),
            value_type: FieldType::Text,
        }
    }

    pub fn with_hardend(mut self, hardend: bool) -> Self {
        self.hardend = Some(hardend);
        self
    }

    pub fn with_other(mut self, other: impl Into<String>) -> Self {
        self.other.push(other.into());
        self
    }

    pub fn with_include(mut self, include: impl Into<String>) -> Self {
        self.include.push(include.into());
        self
    }

    pub fn with_local_params(mut self, local_params: LocalParams) -> Self {
        self.local_params = local_params;
        self
    }

    pub fn with_type(mut self, value_type: FieldType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn key(&self) -> String {
        response_key(&self.local_params, &self.field)
    }

    pub fn write_params(&self, params: &mut WireParams) {
        let prefix = format!("f.{}.facet.range", self.field);
        merge_param(params, "facet", true.into());
        merge_param(
            params,
            "facet.range",
            ParamValue::Multi(vec![self.local_params.prefix(&self.field)]),
        );
        merge_param(params, &format!("{}.start", prefix), self.start.to_string().into());
        merge_param(params, &format!("{}.end", prefix), self.end.to_string().into());
        merge_param(params, &format!("{}.gap", prefix), self.gap.as_str().into());
        if let Some(hardend) = self.hardend {
            merge_param(params, &format!("{}.hardend", prefix), hardend.into());
        }
        if !self.other.is_empty() {
            merge_param(params, &format!("{}.other", prefix), self.other.clone().into());
        }
        if !self.include.is_empty() {
            merge_param(params, &format!("{}.include", prefix), self.include.clone().into());
        }
    }
}

/// One level of a pivot facet.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotField {
    pub field: String,
    pub options: FacetOptions,
}

impl PivotField {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            options: FacetOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FacetOptions) -> Self {
        self.options = options;
        self
    }
}

/// A `facet.pivot` facet over several fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetPivot {
    pub fields: Vec<PivotField>,
    pub local_params: LocalParams,
}

impl FacetPivot {
    pub fn new(fields: Vec<PivotField>) -> Self {
        Self {
            fields,
            local_params: LocalParams::new(),
        }
    }

    pub fn with_local_params(mut self, local_params: LocalParams) -> Self {
        self.local_params = local_params;
        self
    }

    fn field_list(&self) -> String {
        self.fields
            .iter()
            .map(|level| level.field.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn key(&self) -> String {
        response_key(&self.local_params, &self.field_list())
    }

    pub fn write_params(&self, params: &mut WireParams) {
        merge_param(params, "facet", true.into());
        merge_param(
            params,
            "facet.pivot",
            ParamValue::Multi(vec![self.local_params.prefix(&self.field_list())]),
        );
        for level in &self.fields {
            for (name, value) in level.options.params_for(&level.field) {
                merge_param(params, &name, value);
            }
        }
    }
}
