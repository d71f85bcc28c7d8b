//! Request parameter values and the wire parameter map.

use indexmap::IndexMap;

/// Prepared request parameters: every name maps to one or more values.
pub type WireParams = IndexMap<String, Vec<String>>;

/// A request parameter value before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Float(f64),
    /// Rendered lowercase.
    Bool(bool),
    /// A single value rendered comma-joined, as `fl=*,score`.
    Joined(Vec<String>),
    /// A repeated parameter, as `fq=a&fq=b`.
    Multi(Vec<String>),
}

impl ParamValue {
    /// Renders to wire values.
    pub fn render(&self) -> Vec<String> {
        match self {
            ParamValue::Text(text) => vec![text.clone()],
            ParamValue::Int(n) => vec![n.to_string()],
            ParamValue::Float(x) => vec![x.to_string()],
            ParamValue::Bool(b) => vec![b.to_string()],
            ParamValue::Joined(items) => vec![items.join(",")],
            ParamValue::Multi(items) => items.clone(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Multi(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// Merges one parameter into `params`: repeated values extend, scalars
/// overwrite.
pub fn merge_param(params: &mut WireParams, name: &str, value: ParamValue) {
    match value {
        ParamValue::Multi(items) => params.entry(name.to_string()).or_default().extend(items),
        scalar => {
            params.insert(name.to_string(), scalar.render());
        }
    }
}

/// Escapes `%`, `&` and `+` so a value survives in a query string.
pub fn quote_wire(text: &str) -> String {
    text.replace('%', "%25")
        .replace('&', "%26")
        .replace('+', "%2B")
}

/// Renders `q` followed by every parameter as `name=value` pairs joined by `&`.
pub fn to_query_string(q: &str, params: &WireParams) -> String {
    let mut parts = vec![format!("q={}", quote_wire(q))];
    for (name, values) in params {
        for value in values {
            parts.push(format!("{}={}", quote_wire(name), quote_wire(value)));
        }
    }
    parts.join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(ParamValue::Bool(true).render(), vec!["true"]);
        assert_eq!(
            ParamValue::Joined(vec!["*".into(), "score".into()]).render(),
            vec!["*,score"]
        );
        assert_eq!(ParamValue::from(vec!["a", "b"]).render(), vec!["a", "b"]);
    }

    #[test]
    fn test_merge_param() {
        let mut params = WireParams::new();
        merge_param(&mut params, "facet", true.into());
        merge_param(&mut params, "facet.field", vec!["a"].into());
        merge_param(&mut params, "facet.field", vec!["b"].into());
        merge_param(&mut params, "facet", true.into());
        assert_eq!(params.len(), 2);
        assert_eq!(params["facet.field"], vec!["a", "b"]);
    }

    #[test]
    fn test_query_string_escapes() {
        let mut params = WireParams::new();
        params.insert("fq".into(), vec!["a&b".into(), "100%".into()]);
        params.insert("boost".into(), vec!["x+1".into()]);
        assert_eq!(
            to_query_string("*:*", &params),
            "q=*:*&fq=a%26b&fq=100%25&boost=x%2B1"
        );
    }
}
