//! The immutable query builder.
//!
//! Every mutator takes `&self` and returns a new [`SearchQuery`]; the original
//! is never changed, so one query can serve as a template for many requests.
//! Collections are shared between a query and the queries derived from it and
//! copied only when one of them changes (`Arc::make_mut`).
//!
//! A query executes lazily, at most once: the first call that needs results
//! dispatches the request and caches the response on that instance. Clones
//! start with an empty cache.
//!
//! # Example
//!
//! ```rust,ignore
//! let query = searcher
//!     .search("phone")
//!     .filter(Expr::exact("status", 0))
//!     .facet_field(FacetField::new("category").with_type(FieldType::Integer))
//!     .order_by(["-price"])
//!     .limit(10);
//! let results = query.results()?;
//! ```

use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::client::InstanceMapper;
use crate::components::{
    Component, FacetField, FacetOptions, FacetPivot, FacetQuery, FacetRange, FilterQuery,
    GroupOptions, Grouping, HighlightOptions, StatsField,
};
use crate::error::QueryError;
use crate::expr::Expr;
use crate::local_params::LocalParams;
use crate::params::{ParamValue, WireParams, merge_param, to_query_string};
use crate::results::{Document, ResultShape, SearchResults};
use crate::searcher::Searcher;

/// Accumulated request state. Collections are shared until written.
#[derive(Debug, Clone, Default)]
struct QueryState {
    q: String,
    q_local_params: LocalParams,
    fq: Arc<Vec<FilterQuery>>,
    params: Arc<IndexMap<String, ParamValue>>,
    qf: Arc<Vec<(String, f64)>>,
    facet_fields: Arc<Vec<FacetField>>,
    facet_queries: Arc<Vec<FacetQuery>>,
    facet_ranges: Arc<Vec<FacetRange>>,
    facet_pivots: Arc<Vec<FacetPivot>>,
    groupings: Arc<Vec<Grouping>>,
    stats_fields: Arc<Vec<StatsField>>,
    iter_instances: bool,
}

impl QueryState {
    fn set_param(&mut self, name: &str, value: ParamValue) {
        Arc::make_mut(&mut self.params).insert(name.to_string(), value);
    }

    fn remove_param(&mut self, name: &str) {
        if self.params.contains_key(name) {
            Arc::make_mut(&mut self.params).shift_remove(name);
        }
    }

    /// Removes the component switch `name` and every `name.*` parameter.
    fn remove_component(&mut self, name: &str) {
        let prefix = format!("{}.", name);
        if self
            .params
            .keys()
            .any(|key| key == name || key.starts_with(&prefix))
        {
            Arc::make_mut(&mut self.params).retain(|key, _| key != name && !key.starts_with(&prefix));
        }
    }

    fn push_sort(&mut self, fields: Vec<String>) {
        let mut sort = match self.params.get("sort") {
            Some(ParamValue::Joined(existing)) => existing.clone(),
            Some(other) => other.render(),
            None => Vec::new(),
        };
        sort.extend(fields);
        self.set_param("sort", ParamValue::Joined(sort));
    }
}

/// Joins list values with commas; scalars pass through.
fn joined(value: ParamValue) -> ParamValue {
    match value {
        ParamValue::Multi(items) => ParamValue::Joined(items),
        other => other,
    }
}

type Setter = fn(&mut QueryState, ParamValue);

/// Parameters accepted by [`SearchQuery::param`], keyed by wire name.
const SETTERS: &[(&str, Setter)] = &[
    ("rows", |state, value| state.set_param("rows", value)),
    ("start", |state, value| state.set_param("start", value)),
    ("fl", |state, value| state.set_param("fl", joined(value))),
    ("sort", |state, value| state.set_param("sort", joined(value))),
    ("defType", |state, value| state.set_param("defType", value)),
    ("q.op", |state, value| state.set_param("q.op", value)),
    ("df", |state, value| state.set_param("df", value)),
    ("mm", |state, value| state.set_param("mm", value)),
    ("pf", |state, value| state.set_param("pf", value)),
    ("ps", |state, value| state.set_param("ps", value)),
    ("qs", |state, value| state.set_param("qs", value)),
    ("tie", |state, value| state.set_param("tie", value)),
    ("bq", |state, value| state.set_param("bq", value)),
    ("bf", |state, value| state.set_param("bf", value)),
    ("boost", |state, value| state.set_param("boost", value)),
    ("qt", |state, value| state.set_param("qt", value)),
    ("timeAllowed", |state, value| state.set_param("timeAllowed", value)),
    ("debugQuery", |state, value| state.set_param("debugQuery", value)),
    ("echoParams", |state, value| state.set_param("echoParams", value)),
    ("spellcheck", |state, value| state.set_param("spellcheck", value)),
    ("spellcheck.q", |state, value| state.set_param("spellcheck.q", value)),
];

fn find_setter(name: &str) -> Option<Setter> {
    SETTERS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, setter)| *setter)
}

/// Result of [`SearchQuery::slice`].
#[derive(Debug)]
pub enum Slice<'a> {
    /// The query was not executed: a new query restricted to the window.
    Pending(SearchQuery),
    /// The query was executed: the cached documents in the window.
    Docs(&'a [Document]),
}

/// An immutable, lazily executed search request.
pub struct SearchQuery {
    searcher: Searcher,
    state: QueryState,
    instance_mapper: Option<Arc<dyn InstanceMapper>>,
    cache: OnceLock<SearchResults>,
}

impl Clone for SearchQuery {
    fn clone(&self) -> Self {
        Self {
            searcher: self.searcher.clone(),
            state: self.state.clone(),
            instance_mapper: self.instance_mapper.clone(),
            cache: OnceLock::new(),
        }
    }
}

impl fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchQuery")
            .field("q", &self.make_q())
            .field("fq", &self.state.fq.len())
            .field("params", &self.state.params)
            .field("executed", &self.is_executed())
            .finish()
    }
}

impl SearchQuery {
    pub(crate) fn new(searcher: Searcher, q: String) -> Self {
        let instance_mapper = searcher.instance_mapper().cloned();
        Self {
            searcher,
            state: QueryState {
                q,
                ..Default::default()
            },
            instance_mapper,
            cache: OnceLock::new(),
        }
    }

    fn derive(&self, change: impl FnOnce(&mut QueryState)) -> SearchQuery {
        let mut clone = self.clone();
        change(&mut clone.state);
        clone
    }

    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    // Query text

    /// Replaces the query text.
    pub fn search(&self, q: impl Into<String>) -> SearchQuery {
        let q = q.into();
        self.derive(|state| state.q = q)
    }

    /// Replaces the query text with a serialized expression.
    pub fn search_expr(&self, expr: &Expr) -> SearchQuery {
        self.search(expr.to_string())
    }

    /// Sets the local params of the main query.
    pub fn local_params(&self, local_params: LocalParams) -> SearchQuery {
        self.derive(|state| state.q_local_params = local_params)
    }

    /// Uses the DisMax parser.
    pub fn dismax(&self) -> SearchQuery {
        self.set_param("defType", "dismax")
    }

    /// Uses the Extended DisMax parser.
    pub fn edismax(&self) -> SearchQuery {
        self.set_param("defType", "edismax")
    }

    /// Replaces the query fields and their boosts.
    pub fn qf<F: Into<String>>(&self, fields: impl IntoIterator<Item = (F, f64)>) -> SearchQuery {
        let fields: Vec<(String, f64)> = fields.into_iter().map(|(f, w)| (f.into(), w)).collect();
        self.derive(|state| state.qf = Arc::new(fields))
    }

    /// Sets the boost of one query field, adding it if missing.
    pub fn field_weight(&self, field: &str, weight: f64) -> SearchQuery {
        self.derive(|state| {
            let qf = Arc::make_mut(&mut state.qf);
            match qf.iter_mut().find(|(name, _)| name == field) {
                Some(entry) => entry.1 = weight,
                None => qf.push((field.to_string(), weight)),
            }
        })
    }

    // Filters

    /// Adds a filter query.
    pub fn filter(&self, expr: Expr) -> SearchQuery {
        self.filter_with(expr, LocalParams::new())
    }

    /// Adds a filter query with local params.
    pub fn filter_with(&self, expr: Expr, local_params: LocalParams) -> SearchQuery {
        self.derive(|state| Arc::make_mut(&mut state.fq).push(FilterQuery::new(expr, local_params)))
    }

    /// Adds a filter query excluding documents matching `expr`.
    pub fn exclude(&self, expr: Expr) -> SearchQuery {
        self.filter(!expr)
    }

    /// Filter queries in the order they were added.
    pub fn filters(&self) -> &[FilterQuery] {
        &self.state.fq
    }

    // Sorting, paging and projection

    /// Appends sort fields. A leading `-` sorts descending.
    pub fn order_by<S: AsRef<str>>(&self, fields: impl IntoIterator<Item = S>) -> SearchQuery {
        let fields: Vec<String> = fields
            .into_iter()
            .map(|field| match field.as_ref().strip_prefix('-') {
                Some(name) => format!("{} desc", name),
                None => format!("{} asc", field.as_ref()),
            })
            .collect();
        if fields.is_empty() {
            return self.clone();
        }
        self.derive(|state| state.push_sort(fields))
    }

    /// Removes every sort field.
    pub fn clear_order(&self) -> SearchQuery {
        self.derive(|state| state.remove_param("sort"))
    }

    /// Sets the number of rows.
    pub fn limit(&self, rows: usize) -> SearchQuery {
        self.set_param("rows", rows)
    }

    /// Sets the offset of the first row.
    pub fn offset(&self, start: usize) -> SearchQuery {
        self.set_param("start", start)
    }

    /// Restricts the returned fields.
    pub fn only<S: Into<String>>(&self, fields: impl IntoIterator<Item = S>) -> SearchQuery {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.set_param("fl", ParamValue::Joined(fields))
    }

    /// Fetches only unique keys; results are consumed as mapped instances.
    pub fn instances(&self) -> SearchQuery {
        let unique_key = self.searcher.config().unique_key.clone();
        self.derive(|state| {
            state.iter_instances = true;
            state.set_param("fl", ParamValue::Joined(vec![unique_key]));
        })
    }

    /// Replaces the instance mapper of this query.
    pub fn instance_mapper(&self, mapper: impl InstanceMapper + 'static) -> SearchQuery {
        let mut clone = self.clone();
        clone.instance_mapper = Some(Arc::new(mapper));
        clone
    }

    // Raw parameters

    /// Sets any request parameter.
    pub fn set_param(&self, name: &str, value: impl Into<ParamValue>) -> SearchQuery {
        let value = value.into();
        self.derive(|state| state.set_param(name, value))
    }

    /// Sets a recognized request parameter.
    ///
    /// Underscores in `name` stand for dots, so `q_op` sets `q.op`. Unknown
    /// names fail with [`QueryError::ParameterNotFound`].
    pub fn param(&self, name: &str, value: impl Into<ParamValue>) -> Result<SearchQuery, QueryError> {
        let setter = find_setter(name)
            .or_else(|| find_setter(&name.replace('_', ".")))
            .ok_or_else(|| QueryError::ParameterNotFound {
                name: name.to_string(),
            })?;
        let value = value.into();
        Ok(self.derive(|state| setter(state, value)))
    }

    /// Returns the value of an explicitly set parameter.
    pub fn get_param(&self, name: &str) -> Option<&ParamValue> {
        self.state.params.get(name)
    }

    // Faceting

    /// Turns faceting on with global options and a field facet per field.
    pub fn facet<S: Into<String>>(
        &self,
        fields: impl IntoIterator<Item = S>,
        options: FacetOptions,
    ) -> SearchQuery {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.derive(|state| {
            state.set_param("facet", true.into());
            for (name, value) in options.global_params() {
                state.set_param(&name, value);
            }
            let facet_fields = Arc::make_mut(&mut state.facet_fields);
            facet_fields.extend(fields.into_iter().map(FacetField::new));
        })
    }

    /// Turns faceting off and drops every facet.
    pub fn no_facet(&self) -> SearchQuery {
        self.derive(|state| {
            state.remove_component("facet");
            state.facet_fields = Arc::default();
            state.facet_queries = Arc::default();
            state.facet_ranges = Arc::default();
            state.facet_pivots = Arc::default();
        })
    }

    pub fn facet_field(&self, facet: impl Into<FacetField>) -> SearchQuery {
        let facet = facet.into();
        self.derive(|state| Arc::make_mut(&mut state.facet_fields).push(facet))
    }

    pub fn facet_query(&self, expr: Expr, local_params: LocalParams) -> SearchQuery {
        self.with_component(FacetQuery::new(Some(expr), local_params).into())
    }

    pub fn facet_range(&self, facet: FacetRange) -> SearchQuery {
        self.derive(|state| Arc::make_mut(&mut state.facet_ranges).push(facet))
    }

    pub fn facet_pivot(&self, facet: FacetPivot) -> SearchQuery {
        self.derive(|state| Arc::make_mut(&mut state.facet_pivots).push(facet))
    }

    /// Attaches any component.
    pub fn with_component(&self, component: Component) -> SearchQuery {
        self.derive(|state| match component {
            Component::FacetField(facet) => Arc::make_mut(&mut state.facet_fields).push(facet),
            Component::FacetQuery(facet) => Arc::make_mut(&mut state.facet_queries).push(facet),
            Component::FacetRange(facet) => Arc::make_mut(&mut state.facet_ranges).push(facet),
            Component::FacetPivot(facet) => Arc::make_mut(&mut state.facet_pivots).push(facet),
            Component::Stats(stats) => {
                state.set_param("stats", true.into());
                Arc::make_mut(&mut state.stats_fields).push(stats);
            }
            Component::Group(grouping) => Arc::make_mut(&mut state.groupings).push(grouping),
        })
    }

    // Grouping

    /// Sets global group options and a field grouping per field.
    ///
    /// The `group` switch itself is emitted only once a grouping exists.
    pub fn group<S: Into<String>>(
        &self,
        fields: impl IntoIterator<Item = S>,
        options: GroupOptions,
    ) -> SearchQuery {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.derive(|state| {
            for (name, value) in options.params() {
                state.set_param(&name, value);
            }
            let groupings = Arc::make_mut(&mut state.groupings);
            groupings.extend(fields.into_iter().map(Grouping::field));
        })
    }

    /// Turns grouping off and drops every grouping.
    pub fn no_group(&self) -> SearchQuery {
        self.derive(|state| {
            state.remove_component("group");
            state.groupings = Arc::default();
        })
    }

    pub fn group_field(&self, field: impl Into<String>) -> SearchQuery {
        self.with_component(Grouping::field(field).into())
    }

    pub fn group_query(&self, expr: Expr) -> SearchQuery {
        self.with_component(Grouping::Query(expr).into())
    }

    pub fn group_func(&self, func: impl Into<String>) -> SearchQuery {
        self.with_component(Grouping::Func(func.into()).into())
    }

    // Statistics and highlighting

    pub fn stats(&self, stats: impl Into<StatsField>) -> SearchQuery {
        self.with_component(Component::Stats(stats.into()))
    }

    /// Turns highlighting on for `fields`.
    pub fn highlight<S: Into<String>>(
        &self,
        fields: impl IntoIterator<Item = S>,
        options: HighlightOptions,
    ) -> SearchQuery {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.derive(|state| {
            state.remove_component("hl");
            for (name, value) in options.params(&fields) {
                state.set_param(&name, value);
            }
        })
    }

    pub fn no_highlight(&self) -> SearchQuery {
        self.derive(|state| state.remove_component("hl"))
    }

    // Serialization

    /// The main query with its local params.
    pub fn make_q(&self) -> String {
        self.state.q_local_params.prefix(&self.state.q)
    }

    /// The prepared wire parameters, without `q`.
    pub fn params(&self) -> WireParams {
        self.prepare(false)
    }

    fn prepare(&self, only_count: bool) -> WireParams {
        let state = &self.state;
        let config = self.searcher.config();
        let mut wire = WireParams::new();

        for (name, value) in state.params.iter() {
            wire.insert(name.clone(), value.render());
        }
        if only_count {
            wire.insert("rows".to_string(), vec!["0".to_string()]);
        } else if let Some(rows) = config.default_rows {
            wire.entry("rows".to_string())
                .or_insert_with(|| vec![rows.to_string()]);
        }
        if !state.fq.is_empty() {
            wire.insert(
                "fq".to_string(),
                state.fq.iter().map(FilterQuery::to_string).collect(),
            );
        }
        if !state.qf.is_empty() {
            let qf: Vec<String> = state
                .qf
                .iter()
                .filter(|(_, weight)| *weight != 0.0)
                .map(|(field, weight)| format!("{}^{}", field, weight))
                .collect();
            wire.insert("qf".to_string(), vec![qf.join(" ")]);
        }
        if !wire.contains_key("fl") {
            merge_param(
                &mut wire,
                "fl",
                ParamValue::Joined(config.default_field_list()),
            );
        }

        for grouping in state.groupings.iter() {
            grouping.write_params(&mut wire);
        }
        for facet in state.facet_fields.iter() {
            facet.write_params(&mut wire);
        }
        for facet in state.facet_queries.iter() {
            facet.write_params(&mut wire);
        }
        for facet in state.facet_ranges.iter() {
            facet.write_params(&mut wire);
        }
        for facet in state.facet_pivots.iter() {
            facet.write_params(&mut wire);
        }
        for stats in state.stats_fields.iter() {
            stats.write_params(&mut wire);
        }

        trace!(params = ?wire, "Prepared query parameters");
        wire
    }

    // Execution

    fn execute(&self, only_count: bool) -> Result<SearchResults, QueryError> {
        let q = self.make_q();
        let params = self.prepare(only_count);
        debug!(q = %q, only_count, fq = self.state.fq.len(), "Executing search query");
        let raw = self.searcher.select(&q, &params)?;
        let shape = ResultShape {
            unique_key: &self.searcher.config().unique_key,
            facet_fields: &self.state.facet_fields,
            facet_ranges: &self.state.facet_ranges,
            groupings: &self.state.groupings,
            instance_mapper: self.instance_mapper.as_deref(),
        };
        Ok(SearchResults::build(raw, &shape))
    }

    /// Returns true once the results are cached on this instance.
    pub fn is_executed(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Executes the query once and returns the cached results.
    pub fn results(&self) -> Result<&SearchResults, QueryError> {
        if let Some(results) = self.cache.get() {
            return Ok(results);
        }
        let results = self.execute(false)?;
        Ok(self.cache.get_or_init(|| results))
    }

    /// Number of matching documents.
    ///
    /// Uses the cached results when present; otherwise requests zero rows with
    /// every other parameter unchanged, leaving this instance unexecuted.
    pub fn count(&self) -> Result<u64, QueryError> {
        if let Some(results) = self.cache.get() {
            return Ok(results.num_found());
        }
        Ok(self.execute(true)?.num_found())
    }

    /// Number of returned documents.
    pub fn len(&self) -> Result<usize, QueryError> {
        Ok(self.results()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, QueryError> {
        Ok(self.results()?.is_empty())
    }

    /// Returned documents.
    pub fn docs(&self) -> Result<&[Document], QueryError> {
        Ok(self.results()?.docs())
    }

    /// Returns the document at `index`, executing the query if needed.
    pub fn get(&self, index: usize) -> Result<Option<&Document>, QueryError> {
        Ok(self.docs()?.get(index))
    }

    /// Instances of the returned documents, skipping unmapped ones.
    ///
    /// Intended for queries built with [`SearchQuery::instances`].
    pub fn mapped_instances(&self) -> Result<Vec<&serde_json::Value>, QueryError> {
        Ok(self
            .docs()?
            .iter()
            .filter_map(|doc| doc.instance.as_ref())
            .collect())
    }

    /// Returns true when built with [`SearchQuery::instances`].
    pub fn iterates_instances(&self) -> bool {
        self.state.iter_instances
    }

    /// A window of the results.
    ///
    /// Before execution this returns a new query with `start` and `rows` set
    /// for the window; after execution it slices the cached documents.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Slice<'_> {
        let start = match range.start_bound() {
            Bound::Included(n) => Some(*n),
            Bound::Excluded(n) => Some(n.saturating_add(1)),
            Bound::Unbounded => None,
        };
        let stop = match range.end_bound() {
            Bound::Included(n) => Some(n.saturating_add(1)),
            Bound::Excluded(n) => Some(*n),
            Bound::Unbounded => None,
        };

        if let Some(results) = self.cache.get() {
            let docs = results.docs();
            let stop = stop.unwrap_or(docs.len()).min(docs.len());
            let start = start.unwrap_or(0).min(stop);
            return Slice::Docs(&docs[start..stop]);
        }

        let mut window = self.clone();
        if let Some(start) = start {
            window.state.set_param("start", start.into());
        }
        if let Some(stop) = stop {
            let rows = stop.saturating_sub(start.unwrap_or(0));
            window.state.set_param("rows", rows.into());
        }
        Slice::Pending(window)
    }

    /// Returns the first document matching `expr`.
    pub fn first(&self, expr: Expr) -> Result<Option<Document>, QueryError> {
        let query = self.filter(expr).limit(1);
        Ok(query.get(0)?.cloned())
    }
}

impl fmt::Display for SearchQuery {
    /// The wire form: `q=...` followed by every prepared parameter.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_query_string(&self.make_q(), &self.params()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SearchClient, TransportError};
    use crate::results::RawResult;

    struct NoClient;

    impl SearchClient for NoClient {
        fn select(&self, _q: &str, _params: &WireParams) -> Result<RawResult, TransportError> {
            Err("offline".into())
        }
    }

    fn query() -> SearchQuery {
        Searcher::new(NoClient).search("test")
    }

    #[test]
    fn test_default_params() {
        let params = query().params();
        assert_eq!(params["fl"], vec!["*,score"]);
        assert_eq!(params.len(), 1);
        assert_eq!(query().to_string(), "q=test&fl=*,score");
    }

    #[test]
    fn test_mutators_leave_original_untouched() {
        let base = query().filter(Expr::exact("status", 0));
        let derived = base.filter(Expr::exact("category", 5)).limit(10);
        assert_eq!(base.filters().len(), 1);
        assert_eq!(derived.filters().len(), 2);
        assert!(base.params().get("rows").is_none());
        assert_eq!(derived.params()["rows"], vec!["10"]);
    }

    #[test]
    fn test_param_table() {
        let q = query().param("defType", "edismax").unwrap();
        assert_eq!(q.params()["defType"], vec!["edismax"]);

        let q = query().param("q_op", "AND").unwrap();
        assert_eq!(q.params()["q.op"], vec!["AND"]);

        let q = query().param("fl", vec!["id", "name"]).unwrap();
        assert_eq!(q.params()["fl"], vec!["id,name"]);

        let err = query().param("no_such_param", 1).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_order_by() {
        let q = query().order_by(["-price", "name"]).order_by(["id"]);
        assert_eq!(q.params()["sort"], vec!["price desc,name asc,id asc"]);
        assert!(q.clear_order().params().get("sort").is_none());
        assert!(query().order_by(Vec::<&str>::new()).params().get("sort").is_none());
    }

    #[test]
    fn test_qf_and_field_weight() {
        let q = query()
            .qf([("name", 1.0), ("description", 0.5)])
            .field_weight("name", 2.0)
            .field_weight("tags", 0.0)
            .field_weight("sku", 3.0);
        assert_eq!(q.params()["qf"], vec!["name^2 description^0.5 sku^3"]);
    }

    #[test]
    fn test_no_facet_removes_facet_params() {
        let q = query()
            .facet(["category"], FacetOptions::new().with_mincount(1))
            .facet_query(Expr::gte("price", 100), LocalParams::new());
        let params = q.params();
        assert_eq!(params["facet"], vec!["true"]);
        assert_eq!(params["facet.mincount"], vec!["1"]);
        assert_eq!(params["facet.field"], vec!["category"]);
        assert_eq!(params["facet.query"], vec!["price:[100 TO *]"]);

        let params = q.no_facet().params();
        assert!(params.keys().all(|key| !key.starts_with("facet")));
    }

    #[test]
    fn test_group_switch_needs_a_grouping() {
        let q = query().group(Vec::<String>::new(), GroupOptions::new().with_limit(3));
        let params = q.params();
        assert!(params.get("group").is_none());
        assert_eq!(params["group.limit"], vec!["3"]);

        let params = q.group_field("company").params();
        assert_eq!(params["group"], vec!["true"]);
        assert_eq!(params["group.field"], vec!["company"]);

        assert!(q.no_group().params().keys().all(|key| !key.starts_with("group")));
    }

    #[test]
    fn test_highlight_toggle() {
        let q = query().highlight(["name"], HighlightOptions::new().with_snippets(3));
        assert_eq!(q.params()["hl"], vec!["true"]);
        assert_eq!(q.params()["hl.fl"], vec!["name"]);
        assert!(q.no_highlight().params().keys().all(|key| !key.starts_with("hl")));
    }

    #[test]
    fn test_local_params_on_main_query() {
        let q = query()
            .search_expr(&Expr::exact("name", "phone"))
            .local_params(LocalParams::of_type("edismax").with("qf", "name"));
        assert_eq!(q.make_q(), "{!edismax qf=name}name:\"phone\"");
    }

    #[test]
    fn test_slice_before_execution() {
        match query().slice(10..30) {
            Slice::Pending(window) => {
                let params = window.params();
                assert_eq!(params["start"], vec!["10"]);
                assert_eq!(params["rows"], vec!["20"]);
                assert!(!window.is_executed());
            }
            Slice::Docs(_) => panic!("unexecuted query must not slice documents"),
        }
        match query().slice(..5) {
            Slice::Pending(window) => {
                assert!(window.params().get("start").is_none());
                assert_eq!(window.params()["rows"], vec!["5"]);
            }
            Slice::Docs(_) => panic!("unexecuted query must not slice documents"),
        }
    }

    #[test]
    fn test_transport_error_surfaces() {
        let err = query().results().unwrap_err();
        assert!(matches!(err, QueryError::Transport(_)));
    }
}
