//! Result grouping.

use crate::expr::Expr;
use crate::params::{ParamValue, WireParams, merge_param};
use crate::value::FieldType;

/// One grouping command.
#[derive(Debug, Clone, PartialEq)]
pub enum Grouping {
    /// Group by the values of a field.
    Field { field: String, value_type: FieldType },
    /// One group holding the documents matching a query.
    Query(Expr),
    /// Group by the result of a function query.
    Func(String),
}

impl Grouping {
    pub fn field(field: impl Into<String>) -> Self {
        Grouping::Field {
            field: field.into(),
            value_type: FieldType::Text,
        }
    }

    /// Key under which the engine reports this grouping.
    pub fn key(&self) -> String {
        match self {
            Grouping::Field { field, .. } => field.clone(),
            Grouping::Query(expr) => expr.to_string(),
            Grouping::Func(func) => func.clone(),
        }
    }

    pub fn write_params(&self, params: &mut WireParams) {
        // the component is only switched on once something to group by exists
        merge_param(params, "group", true.into());
        let (name, value) = match self {
            Grouping::Field { field, .. } => ("group.field", field.clone()),
            Grouping::Query(expr) => ("group.query", expr.to_string()),
            Grouping::Func(func) => ("group.func", func.clone()),
        };
        merge_param(params, name, ParamValue::Multi(vec![value]));
    }
}

/// Options shared by every grouping, emitted as `group.<option>`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOptions {
    /// Documents per group.
    pub limit: Option<i64>,
    pub offset: Option<u64>,
    pub sort: Option<String>,
    /// Report the number of groups.
    pub ngroups: Option<bool>,
    /// `grouped` or `simple`.
    pub format: Option<String>,
    pub main: Option<bool>,
    pub truncate: Option<bool>,
    pub facet: Option<bool>,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            limit: None,
            offset: None,
            sort: None,
            ngroups: Some(true),
            format: None,
            main: None,
            truncate: None,
            facet: None,
        }
    }
}

impl GroupOptions {
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

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_ngroups(mut self, ngroups: bool) -> Self {
        self.ngroups = Some(ngroups);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_main(mut self, main: bool) -> Self {
        self.main = Some(main);
        self
    }

    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = Some(truncate);
        self
    }

    pub fn with_facet(mut self, facet: bool) -> Self {
        self.facet = Some(facet);
        self
    }

    pub fn params(&self) -> Vec<(String, ParamValue)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit {
            params.push(("group.limit".to_string(), limit.into()));
        }
        if let Some(offset) = self.offset {
            params.push(("group.offset".to_string(), ParamValue::Int(offset as i64)));
        }
        if let Some(sort) = &self.sort {
            params.push(("group.sort".to_string(), sort.as_str().into()));
        }
        if let Some(ngroups) = self.ngroups {
            params.push(("group.ngroups".to_string(), ngroups.into()));
        }
        if let Some(format) = &self.format {
            params.push(("group.format".to_string(), format.as_str().into()));
        }
        if let Some(main) = self.main {
            params.push(("group.main".to_string(), main.into()));
        }
        if let Some(truncate) = self.truncate {
            params.push(("group.truncate".to_string(), truncate.into()));
        }
        if let Some(facet) = self.facet {
            params.push(("group.facet".to_string(), facet.into()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngroups_on_by_default() {
        let params = GroupOptions::new().with_limit(5).params();
        assert_eq!(
            params,
            vec![
                ("group.limit".to_string(), ParamValue::Int(5)),
                ("group.ngroups".to_string(), ParamValue::Bool(true)),
            ]
        );
    }

    #[test]
    fn test_groupings_accumulate() {
        let mut params = WireParams::new();
        Grouping::field("company").write_params(&mut params);
        Grouping::Query(Expr::gte("price", 100)).write_params(&mut params);
        Grouping::Func("floor(price)".into()).write_params(&mut params);
        assert_eq!(params["group"], vec!["true"]);
        assert_eq!(params["group.field"], vec!["company"]);
        assert_eq!(params["group.query"], vec!["price:[100 TO *]"]);
        assert_eq!(params["group.func"], vec!["floor(price)"]);
    }
}
