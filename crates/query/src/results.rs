//! Engine responses and the typed view over them.
//!
//! [`RawResult`] mirrors the engine's JSON response. [`SearchResults`] is built
//! from it once per executed query: documents are hydrated with instances,
//! facet buckets are coerced through the facet's declared type and groups are
//! collected per grouping command.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::client::InstanceMapper;
use crate::components::{FacetField, FacetRange, Grouping};
use crate::value::{FieldType, Value};

/// A stored document as returned by the engine.
pub type RawDocument = IndexMap<String, JsonValue>;

/// The engine's select response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResult {
    pub response: RawResponse,
    pub facet_counts: Option<FacetCounts>,
    pub grouped: Option<IndexMap<String, RawGroupedField>>,
    pub stats: Option<RawStats>,
    pub highlighting: Option<IndexMap<String, IndexMap<String, Vec<String>>>>,
}

impl RawResult {
    /// Parses an engine response from JSON.
    pub fn from_json(value: JsonValue) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Parses an engine response from JSON text.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// The `response` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResponse {
    #[serde(rename = "numFound")]
    pub num_found: u64,
    pub start: u64,
    pub docs: Vec<RawDocument>,
}

/// The `facet_counts` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetCounts {
    pub facet_queries: IndexMap<String, u64>,
    /// Flat `[value, count, value, count, ...]` arrays per facet key.
    pub facet_fields: IndexMap<String, Vec<JsonValue>>,
    pub facet_ranges: IndexMap<String, RawFacetRange>,
    pub facet_pivot: IndexMap<String, Vec<RawPivot>>,
}

/// One entry of `facet_ranges`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFacetRange {
    pub counts: Vec<JsonValue>,
    pub gap: JsonValue,
    pub start: JsonValue,
    pub end: JsonValue,
    pub before: Option<u64>,
    pub after: Option<u64>,
    pub between: Option<u64>,
}

/// One node of a pivot facet tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPivot {
    pub field: String,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default)]
    pub count: u64,
    /// Children; absent on the deepest level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot: Option<Vec<RawPivot>>,
}

/// The `stats` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStats {
    /// `null` when the field has no values.
    pub stats_fields: IndexMap<String, Option<RawFieldStats>>,
}

/// Statistics of one field. Bounds stay JSON since dates come back as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFieldStats {
    pub min: JsonValue,
    pub max: JsonValue,
    pub sum: JsonValue,
    pub mean: JsonValue,
    pub stddev: JsonValue,
    pub count: u64,
    pub missing: u64,
}

/// One entry of the `grouped` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawGroupedField {
    pub matches: u64,
    pub ngroups: Option<u64>,
    pub groups: Vec<RawGroup>,
    /// Present for query groupings and the `simple` format.
    pub doclist: Option<RawResponse>,
}

/// One group of a field or function grouping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawGroup {
    #[serde(rename = "groupValue")]
    pub group_value: JsonValue,
    pub doclist: RawResponse,
}

/// Iterates a flat `[value, count, ...]` facet array as pairs.
///
/// Pairs whose count is not a non-negative integer are skipped, as is a
/// trailing unpaired value.
pub fn flat_pairs(values: &[JsonValue]) -> impl Iterator<Item = (&JsonValue, u64)> {
    values
        .chunks_exact(2)
        .filter_map(|pair| pair[1].as_u64().map(|count| (&pair[0], count)))
}

/// A document with its mapped instance and highlighted snippets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub fields: RawDocument,
    pub instance: Option<JsonValue>,
    pub highlighting: Option<IndexMap<String, Vec<String>>>,
}

impl Document {
    pub fn new(fields: RawDocument) -> Self {
        Self {
            fields,
            instance: None,
            highlighting: None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    /// Value of the unique key field.
    pub fn id(&self, unique_key: &str) -> Option<Value> {
        self.fields.get(unique_key).and_then(Value::from_json)
    }
}

/// One bucket of a field or range facet.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetValue {
    pub value: Value,
    pub count: u64,
}

/// Typed buckets of one `facet.field`.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetFieldResult {
    pub key: String,
    pub field: String,
    pub values: Vec<FacetValue>,
}

/// Typed buckets of one `facet.range`.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetRangeResult {
    pub key: String,
    pub field: String,
    pub values: Vec<FacetValue>,
    pub before: Option<u64>,
    pub after: Option<u64>,
    pub between: Option<u64>,
}

/// One group of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// `None` for query groupings.
    pub value: Option<Value>,
    pub num_found: u64,
    pub docs: Vec<Document>,
}

/// The groups produced by one grouping command.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedResult {
    pub key: String,
    pub matches: u64,
    pub ngroups: Option<u64>,
    pub groups: Vec<Group>,
}

/// What the query asked for, needed to interpret a [`RawResult`].
pub(crate) struct ResultShape<'a> {
    pub unique_key: &'a str,
    pub facet_fields: &'a [FacetField],
    pub facet_ranges: &'a [FacetRange],
    pub groupings: &'a [Grouping],
    pub instance_mapper: Option<&'a dyn InstanceMapper>,
}

/// The typed result of one executed query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    num_found: u64,
    start: u64,
    docs: Vec<Document>,
    facet_fields: Vec<FacetFieldResult>,
    facet_ranges: Vec<FacetRangeResult>,
    groups: Vec<GroupedResult>,
    raw: RawResult,
}

impl SearchResults {
    pub(crate) fn build(mut raw: RawResult, shape: &ResultShape<'_>) -> Self {
        let highlighting = raw.highlighting.take().unwrap_or_default();
        let mut docs: Vec<Document> = std::mem::take(&mut raw.response.docs)
            .into_iter()
            .map(Document::new)
            .collect();
        for doc in &mut docs {
            if let Some(id) = doc.id(shape.unique_key) {
                doc.highlighting = highlighting.get(&id.to_string()).cloned();
            }
        }
        if let Some(mapper) = shape.instance_mapper {
            hydrate(&mut docs, shape.unique_key, mapper);
        }

        let counts = raw.facet_counts.clone().unwrap_or_default();
        let facet_fields = shape
            .facet_fields
            .iter()
            .map(|facet| {
                let key = facet.key();
                let values = counts
                    .facet_fields
                    .get(&key)
                    .map(|raw| typed_buckets(&key, raw, facet.value_type))
                    .unwrap_or_default();
                FacetFieldResult {
                    key,
                    field: facet.field.clone(),
                    values,
                }
            })
            .collect();

        let facet_ranges = shape
            .facet_ranges
            .iter()
            .map(|facet| {
                let key = facet.key();
                let raw_range = counts.facet_ranges.get(&key).cloned().unwrap_or_default();
                FacetRangeResult {
                    values: typed_buckets(&key, &raw_range.counts, facet.value_type),
                    key,
                    field: facet.field.clone(),
                    before: raw_range.before,
                    after: raw_range.after,
                    between: raw_range.between,
                }
            })
            .collect();

        let grouped = raw.grouped.clone().unwrap_or_default();
        let groups = shape
            .groupings
            .iter()
            .filter_map(|grouping| {
                let key = grouping.key();
                let raw_group = grouped.get(&key)?;
                Some(grouped_result(key, raw_group, grouping, shape))
            })
            .collect();

        Self {
            num_found: raw.response.num_found,
            start: raw.response.start,
            docs,
            facet_fields,
            facet_ranges,
            groups,
            raw,
        }
    }

    /// Total number of matching documents.
    pub fn num_found(&self) -> u64 {
        self.num_found
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Returned documents.
    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    /// Number of returned documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn facet_fields(&self) -> &[FacetFieldResult] {
        &self.facet_fields
    }

    /// Buckets of the field facet reported under `key`.
    pub fn facet_field(&self, key: &str) -> Option<&FacetFieldResult> {
        self.facet_fields.iter().find(|facet| facet.key == key)
    }

    /// Count of the query facet reported under `key`.
    pub fn facet_query(&self, key: &str) -> Option<u64> {
        self.facet_counts()
            .and_then(|counts| counts.facet_queries.get(key).copied())
    }

    pub fn facet_range(&self, key: &str) -> Option<&FacetRangeResult> {
        self.facet_ranges.iter().find(|facet| facet.key == key)
    }

    /// Raw pivot tree reported under `key`.
    pub fn facet_pivot(&self, key: &str) -> Option<&[RawPivot]> {
        self.facet_counts()
            .and_then(|counts| counts.facet_pivot.get(key))
            .map(Vec::as_slice)
    }

    pub fn facet_counts(&self) -> Option<&FacetCounts> {
        self.raw.facet_counts.as_ref()
    }

    /// Statistics of `field`; `None` when absent or reported as `null`.
    pub fn stats_field(&self, field: &str) -> Option<&RawFieldStats> {
        self.raw
            .stats
            .as_ref()
            .and_then(|stats| stats.stats_fields.get(field))
            .and_then(Option::as_ref)
    }

    pub fn groups(&self) -> &[GroupedResult] {
        &self.groups
    }

    pub fn group(&self, key: &str) -> Option<&GroupedResult> {
        self.groups.iter().find(|group| group.key == key)
    }

    /// The response without its documents, which moved into [`Self::docs`].
    pub fn raw(&self) -> &RawResult {
        &self.raw
    }
}

fn typed_buckets(key: &str, raw: &[JsonValue], value_type: FieldType) -> Vec<FacetValue> {
    flat_pairs(raw)
        .filter_map(|(value, count)| match value_type.parse_json(value) {
            Some(value) => Some(FacetValue { value, count }),
            None => {
                debug!(facet = key, value = %value, "Skipping facet bucket of unexpected type");
                None
            }
        })
        .collect()
}

fn grouped_result(
    key: String,
    raw: &RawGroupedField,
    grouping: &Grouping,
    shape: &ResultShape<'_>,
) -> GroupedResult {
    let value_type = match grouping {
        Grouping::Field { value_type, .. } => *value_type,
        _ => FieldType::Text,
    };
    let into_docs = |response: &RawResponse| {
        let mut docs: Vec<Document> = response.docs.iter().cloned().map(Document::new).collect();
        if let Some(mapper) = shape.instance_mapper {
            hydrate(&mut docs, shape.unique_key, mapper);
        }
        docs
    };

    let mut groups: Vec<Group> = raw
        .groups
        .iter()
        .map(|group| Group {
            value: value_type.parse_json(&group.group_value),
            num_found: group.doclist.num_found,
            docs: into_docs(&group.doclist),
        })
        .collect();
    if let Some(doclist) = &raw.doclist {
        groups.push(Group {
            value: None,
            num_found: doclist.num_found,
            docs: into_docs(doclist),
        });
    }

    GroupedResult {
        key,
        matches: raw.matches,
        ngroups: raw.ngroups,
        groups,
    }
}

/// Attaches instances to documents with a single mapper call.
fn hydrate(docs: &mut [Document], unique_key: &str, mapper: &dyn InstanceMapper) {
    let ids: Vec<Value> = docs.iter().filter_map(|doc| doc.id(unique_key)).collect();
    if ids.is_empty() {
        return;
    }
    let instances = mapper.map_many(&ids);
    for doc in docs {
        if let Some(id) = doc.id(unique_key) {
            doc.instance = instances.get(&id.to_string()).cloned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn raw() -> RawResult {
        RawResult::from_json(json!({
            "response": {"numFound": 28, "start": 0, "docs": [{"id": "1"}, {"id": "2"}]},
            "facet_counts": {
                "facet_queries": {"cheap": 5},
                "facet_fields": {"cat": ["100", 500, "5", 10, "bad", 1, null, 4]},
                "facet_ranges": {"price": {"counts": ["0", 3, "10", 4], "gap": 10, "start": 0, "end": 20, "before": 1}},
                "facet_pivot": {"manu": [{"field": "manufacturer", "value": "nokia", "count": 2}]}
            },
            "stats": {"stats_fields": {"price_unit": {"min": 3.5, "max": 892.0, "count": 10}, "empty": null}},
            "highlighting": {"1": {"name": ["<em>phone</em>"]}}
        }))
        .unwrap()
    }

    #[test]
    fn test_flat_pairs_skips_bad_counts() {
        let values = vec![json!("a"), json!(1), json!("b"), json!("x"), json!("c")];
        let pairs: Vec<_> = flat_pairs(&values).collect();
        assert_eq!(pairs, vec![(&json!("a"), 1)]);
    }

    #[test]
    fn test_build_typed_view() {
        let facet = FacetField::new("category")
            .with_local_params(crate::LocalParams::new().with("key", "cat"))
            .with_type(FieldType::Integer);
        let range = FacetRange::new("price", 0, 20, "10").with_type(FieldType::Integer);
        let shape = ResultShape {
            unique_key: "id",
            facet_fields: std::slice::from_ref(&facet),
            facet_ranges: std::slice::from_ref(&range),
            groupings: &[],
            instance_mapper: None,
        };
        let results = SearchResults::build(raw(), &shape);

        assert_eq!(results.num_found(), 28);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results.docs()[0].highlighting.as_ref().unwrap()["name"],
            vec!["<em>phone</em>"]
        );

        let cat = results.facet_field("cat").unwrap();
        let values: Vec<_> = cat.values.iter().map(|v| (v.value.clone(), v.count)).collect();
        assert_eq!(
            values,
            vec![(Value::Int(100), 500), (Value::Int(5), 10), (Value::Null, 4)]
        );

        let price = results.facet_range("price").unwrap();
        assert_eq!(price.values.len(), 2);
        assert_eq!(price.before, Some(1));

        assert_eq!(results.facet_query("cheap"), Some(5));
        assert_eq!(results.facet_pivot("manu").unwrap()[0].pivot, None);
        assert_eq!(results.stats_field("price_unit").unwrap().min, json!(3.5));
        assert!(results.stats_field("empty").is_none());
    }

    #[test]
    fn test_hydrate_calls_mapper_once() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let mapper = |ids: &[Value]| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            ids.iter()
                .filter(|id| id.to_string() == "2")
                .map(|id| (id.to_string(), json!({"name": "two"})))
                .collect::<HashMap<_, _>>()
        };
        let shape = ResultShape {
            unique_key: "id",
            facet_fields: &[],
            facet_ranges: &[],
            groupings: &[],
            instance_mapper: Some(&mapper),
        };
        let results = SearchResults::build(raw(), &shape);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(results.docs()[0].instance, None);
        assert_eq!(results.docs()[1].instance, Some(json!({"name": "two"})));
    }

    #[test]
    fn test_grouped_results() {
        let raw = RawResult::from_json(json!({
            "grouped": {
                "company": {"matches": 3, "ngroups": 2, "groups": [
                    {"groupValue": "nokia", "doclist": {"numFound": 2, "docs": [{"id": "1"}, {"id": "2"}]}},
                    {"groupValue": null, "doclist": {"numFound": 1, "docs": [{"id": "3"}]}}
                ]},
                "price:[100 TO *]": {"matches": 3, "doclist": {"numFound": 1, "docs": [{"id": "2"}]}}
            }
        }))
        .unwrap();
        let groupings = vec![
            Grouping::field("company"),
            Grouping::Query(crate::Expr::gte("price", 100)),
        ];
        let shape = ResultShape {
            unique_key: "id",
            facet_fields: &[],
            facet_ranges: &[],
            groupings: &groupings,
            instance_mapper: None,
        };
        let results = SearchResults::build(raw, &shape);
        let company = results.group("company").unwrap();
        assert_eq!(company.ngroups, Some(2));
        assert_eq!(company.groups[0].value, Some(Value::from("nokia")));
        assert_eq!(company.groups[1].value, Some(Value::Null));
        assert_eq!(company.groups[0].docs.len(), 2);

        let query = results.group("price:[100 TO *]").unwrap();
        assert_eq!(query.groups.len(), 1);
        assert_eq!(query.groups[0].value, None);
    }
}
