//! Field statistics and highlighting.

use crate::local_params::LocalParams;
use crate::params::{ParamValue, WireParams, merge_param};

/// A `stats.field` request.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsField {
    pub field: String,
    pub local_params: LocalParams,
    /// Fields to break the statistics down by.
    pub facet_fields: Vec<String>,
}

impl StatsField {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            local_params: LocalParams::new(),
            facet_fields: Vec::new(),
        }
    }

    pub fn with_local_params(mut self, local_params: LocalParams) -> Self {
        self.local_params = local_params;
        self
    }

    pub fn with_facet_field(mut self, field: impl Into<String>) -> Self {
        self.facet_fields.push(field.into());
        self
    }

    pub fn write_params(&self, params: &mut WireParams) {
        merge_param(params, "stats", true.into());
        merge_param(
            params,
            "stats.field",
            ParamValue::Multi(vec![self.local_params.prefix(&self.field)]),
        );
        if !self.facet_fields.is_empty() {
            merge_param(
                params,
                &format!("f.{}.stats.facet", self.field),
                self.facet_fields.clone().into(),
            );
        }
    }
}

impl From<&str> for StatsField {
    fn from(field: &str) -> Self {
        StatsField::new(field)
    }
}

/// Highlighting options, emitted as `hl.<option>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightOptions {
    /// Snippets per field.
    pub snippets: Option<u32>,
    /// Snippet size in characters.
    pub fragsize: Option<u32>,
    pub simple_pre: Option<String>,
    pub simple_post: Option<String>,
}

impl HighlightOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snippets(mut self, snippets: u32) -> Self {
        self.snippets = Some(snippets);
        self
    }

    pub fn with_fragsize(mut self, fragsize: u32) -> Self {
        self.fragsize = Some(fragsize);
        self
    }

    pub fn with_markers(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.simple_pre = Some(pre.into());
        self.simple_post = Some(post.into());
        self
    }

    /// Parameters for highlighting `fields`.
    pub fn params(&self, fields: &[String]) -> Vec<(String, ParamValue)> {
        let mut params = vec![("hl".to_string(), ParamValue::Bool(true))];
        if !fields.is_empty() {
            params.push(("hl.fl".to_string(), ParamValue::Joined(fields.to_vec())));
        }
        if let Some(snippets) = self.snippets {
            params.push(("hl.snippets".to_string(), snippets.into()));
        }
        if let Some(fragsize) = self.fragsize {
            params.push(("hl.fragsize".to_string(), fragsize.into()));
        }
        if let Some(pre) = &self.simple_pre {
            params.push(("hl.simple.pre".to_string(), pre.as_str().into()));
        }
        if let Some(post) = &self.simple_post {
            params.push(("hl.simple.post".to_string(), post.as_str().into()));
        }
        params
    }
}
