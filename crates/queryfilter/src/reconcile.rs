//! Builds [`FilterValue`] lists from facet buckets and the current selection.
//!
//! Values keep the engine's bucket order. A bucket whose value does not
//! coerce to the declared type is skipped, and a bucket repeating an earlier
//! value is dropped. With `ensure_selected_values`, selected values the engine
//! did not return are appended with no count.
//!
//! Pivot trees are reconciled level by level. Instance mappers and titles
//! run after the whole tree is built, so each level's mapper sees every value
//! of its level in a single call.

use std::collections::HashSet;

use serde_json::Value as JsonValue;
use solar_query::{FieldType, RawPivot, Value};
use tracing::debug;

use crate::value::{FilterValue, Mapper, TitleFn};

/// One engine bucket.
pub(crate) struct Bucket<'r> {
    pub raw: &'r JsonValue,
    pub count: u64,
    pub children: Option<&'r [RawPivot]>,
}

impl<'r> Bucket<'r> {
    pub fn flat(raw: &'r JsonValue, count: u64) -> Self {
        Self {
            raw,
            count,
            children: None,
        }
    }

    pub fn pivot(node: &'r RawPivot) -> Self {
        Self {
            raw: &node.value,
            count: node.count,
            children: node.pivot.as_deref(),
        }
    }
}

/// Declared behavior of one facet level.
pub(crate) struct Level<'a> {
    pub value_type: FieldType,
    pub ensure_selected_values: bool,
    pub instance_mapper: Option<&'a Mapper>,
    pub title: Option<&'a TitleFn>,
}

/// Reconciles one level. Returns each value with the children of its bucket.
pub(crate) fn facet_values<'r>(
    filter_name: &str,
    level: &Level<'_>,
    buckets: impl IntoIterator<Item = Bucket<'r>>,
    selected: &[Value],
    path: Option<&str>,
) -> Vec<(FilterValue, Option<&'r [RawPivot]>)> {
    let selected_keys: Vec<String> = selected.iter().map(Value::to_string).collect();
    let filter_value = |key: &str| match path {
        Some(path) => format!("{}:{}", path, key),
        None => key.to_string(),
    };

    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for bucket in buckets {
        let Some(value) = level.value_type.parse_json(bucket.raw) else {
            debug!(
                filter = filter_name,
                value = %bucket.raw,
                value_type = %level.value_type,
                "Skipping facet bucket that does not match the declared type"
            );
            continue;
        };
        let key = value.to_string();
        if !seen.insert(key.clone()) {
            continue;
        }
        let is_selected = selected_keys.contains(&key);
        values.push((
            FilterValue::new(filter_name, value, filter_value(&key), Some(bucket.count), is_selected),
            bucket.children,
        ));
    }

    if level.ensure_selected_values {
        for value in selected {
            let key = value.to_string();
            if seen.insert(key.clone()) {
                values.push((
                    FilterValue::new(filter_name, value.clone(), filter_value(&key), None, true),
                    None,
                ));
            }
        }
    }
    values
}

/// Attaches instances with one mapper call and then computes titles.
pub(crate) fn decorate(values: &mut [&mut FilterValue], level: &Level<'_>) {
    if let Some(mapper) = level.instance_mapper {
        if !values.is_empty() {
            let mut seen = HashSet::new();
            let ids: Vec<Value> = values
                .iter()
                .filter(|value| seen.insert(value.value.to_string()))
                .map(|value| value.value.clone())
                .collect();
            let instances = mapper.get().map_many(&ids);
            for value in values.iter_mut() {
                value.instance = instances.get(&value.value.to_string()).cloned();
            }
        }
    }
    if let Some(title) = level.title {
        for value in values.iter_mut() {
            let text = title.title(&**value);
            value.title = text;
        }
    }
}

/// Values selected at `depth` below the node identified by `parent`.
///
/// A selection tuple contributes when it is longer than `depth` and its first
/// `depth` segments render to `parent`.
pub(crate) fn selected_children(selections: &[Vec<Value>], parent: &[String], depth: usize) -> Vec<Value> {
    let mut seen = HashSet::new();
    selections
        .iter()
        .filter(|tuple| tuple.len() > depth)
        .filter(|tuple| {
            tuple[..depth]
                .iter()
                .map(Value::to_string)
                .eq(parent.iter().cloned())
        })
        .map(|tuple| tuple[depth].clone())
        .filter(|value| seen.insert(value.to_string()))
        .collect()
}

/// Reconciles a pivot tree against the selection tuples.
pub(crate) fn pivot_tree(
    filter_name: &str,
    levels: &[Level<'_>],
    nodes: &[RawPivot],
    selections: &[Vec<Value>],
) -> Vec<FilterValue> {
    if levels.is_empty() {
        return Vec::new();
    }
    let mut values = pivot_level(filter_name, levels, 0, nodes, selections, &[]);
    for (depth, level) in levels.iter().enumerate() {
        let mut at_depth = Vec::new();
        collect_level(&mut values, depth, &mut at_depth);
        decorate(&mut at_depth, level);
    }
    values
}

fn pivot_level(
    filter_name: &str,
    levels: &[Level<'_>],
    depth: usize,
    nodes: &[RawPivot],
    selections: &[Vec<Value>],
    parent: &[String],
) -> Vec<FilterValue> {
    let selected = selected_children(selections, parent, depth);
    let path = (depth > 0).then(|| parent.join(":"));
    let level_values = facet_values(
        filter_name,
        &levels[depth],
        nodes.iter().map(Bucket::pivot),
        &selected,
        path.as_deref(),
    );

    level_values
        .into_iter()
        .map(|(mut value, children)| {
            if depth + 1 < levels.len() {
                if let Some(children) = children {
                    let mut child_path = parent.to_vec();
                    child_path.push(value.value.to_string());
                    value.pivot = Some(pivot_level(
                        filter_name,
                        levels,
                        depth + 1,
                        children,
                        selections,
                        &child_path,
                    ));
                }
            }
            value
        })
        .collect()
}

fn collect_level<'v>(values: &'v mut [FilterValue], depth: usize, out: &mut Vec<&'v mut FilterValue>) {
    if depth == 0 {
        out.extend(values.iter_mut());
        return;
    }
    for value in values.iter_mut() {
        if let Some(children) = value.pivot.as_mut() {
            collect_level(children, depth - 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn level(value_type: FieldType) -> Level<'static> {
        Level {
            value_type,
            ensure_selected_values: false,
            instance_mapper: None,
            title: None,
        }
    }

    #[test]
    fn test_facet_values_order_dedup_and_typing() {
        let raw = [json!("100"), json!("5"), json!("abc"), json!("5"), json!(null)];
        let buckets = raw.iter().zip([500, 10, 7, 3, 4]).map(|(v, c)| Bucket::flat(v, c));
        let values = facet_values(
            "cat",
            &level(FieldType::Integer),
            buckets,
            &[Value::Int(5)],
            None,
        );
        let values: Vec<_> = values.into_iter().map(|(value, _)| value).collect();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0].filter_value, "100");
        assert_eq!(values[0].count_plus, "+500");
        assert!(values[1].selected);
        assert_eq!(values[1].count, Some(10));
        assert_eq!(values[2].value, Value::Null);
        assert_eq!(values[2].filter_value, "null");
    }

    #[test]
    fn test_ensure_selected_values_appends_missing() {
        let raw = [json!("kiev")];
        let mut declared = level(FieldType::Text);
        declared.ensure_selected_values = true;
        let values = facet_values(
            "region",
            &declared,
            raw.iter().map(|v| Bucket::flat(v, 42)),
            &[Value::from("kiev"), Value::from("lviv")],
            None,
        );
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].0.filter_value, "lviv");
        assert_eq!(values[1].0.count, None);
        assert_eq!(values[1].0.count_plus, "");
        assert!(values[1].0.selected);
    }

    #[test]
    fn test_selected_children() {
        let selections = vec![
            vec![Value::from("samsung"), Value::from("note")],
            vec![Value::from("nokia"), Value::from("n900"), Value::Bool(false)],
            vec![Value::from("nokia")],
        ];
        assert_eq!(
            selected_children(&selections, &[], 0),
            vec![Value::from("samsung"), Value::from("nokia")]
        );
        assert_eq!(
            selected_children(&selections, &["nokia".to_string()], 1),
            vec![Value::from("n900")]
        );
        assert!(selected_children(&selections, &["lenovo".to_string()], 1).is_empty());
    }

    #[test]
    fn test_pivot_tree_without_levels_is_empty() {
        let nodes: Vec<RawPivot> = serde_json::from_value(json!([
            {"field": "manufacturer", "value": "samsung", "count": 5}
        ]))
        .unwrap();
        let selections = vec![vec![Value::from("samsung")]];

        assert!(pivot_tree("manu", &[], &nodes, &selections).is_empty());
        assert!(pivot_tree("manu", &[], &[], &[]).is_empty());
    }

    #[test]
    fn test_pivot_tree_maps_each_level_once() {
        let nodes: Vec<RawPivot> = serde_json::from_value(json!([
            {"field": "manufacturer", "value": "samsung", "count": 100, "pivot": [
                {"field": "model", "value": "note", "count": 66},
                {"field": "model", "value": "s4", "count": 44}
            ]},
            {"field": "manufacturer", "value": "nokia", "count": 1, "pivot": [
                {"field": "model", "value": "n900", "count": 1}
            ]}
        ]))
        .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mapper = Mapper::new(move |ids: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
            ids.iter()
                .map(|id| (id.to_string(), json!(id.to_string())))
                .collect::<HashMap<_, _>>()
        });
        let title = TitleFn::new(|value: &FilterValue| value.filter_value.to_uppercase());
        let levels = [
            level(FieldType::Text),
            Level {
                value_type: FieldType::Text,
                ensure_selected_values: false,
                instance_mapper: Some(&mapper),
                title: Some(&title),
            },
        ];

        let selections = vec![vec![Value::from("samsung"), Value::from("note")]];
        let tree = pivot_tree("manu", &levels, &nodes, &selections);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(tree[0].selected);
        assert!(!tree[1].selected);
        let note = tree[0].get_pivot_value("samsung:note").unwrap();
        assert!(note.selected);
        assert_eq!(note.title, "SAMSUNG:NOTE");
        assert_eq!(note.instance, Some(json!("note")));
        assert!(note.pivot.is_none());
        assert_eq!(tree[0].pivot_values()[1].count_plus, "+44");
    }
}
