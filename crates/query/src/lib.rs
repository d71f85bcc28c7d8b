//! # solar-query
//!
//! An immutable query builder for Solr-style search engines.
//!
//! ## Overview
//!
//! A [`Searcher`] wraps a [`SearchClient`] and creates [`SearchQuery`]
//! builders. Each builder method returns a new query, so a partially built
//! query can be reused as a template. Queries are executed lazily and at most
//! once per instance.
//!
//! - [`Expr`] builds filter expressions and renders them in query syntax
//! - [`LocalParams`] renders `{!tag=... ex=...}` prefixes
//! - [`components`] holds facets, groupings, statistics and highlighting
//! - [`SearchResults`] is the typed view of an engine response
//!
//! ## Example
//!
//! ```rust,ignore
//! use solar_query::{Expr, FacetField, LocalParams, Searcher};
//!
//! let searcher = Searcher::new(client);
//! let query = searcher
//!     .search_all()
//!     .filter_with(Expr::exact("status", 0), LocalParams::new().with("tag", "status"))
//!     .facet_field(FacetField::new("category"))
//!     .limit(20);
//! println!("{}", query);
//! ```

pub mod client;
pub mod components;
pub mod config;
pub mod error;
pub mod expr;
pub mod local_params;
pub mod params;
pub mod query;
pub mod results;
pub mod searcher;
pub mod value;

pub use client::{InstanceMapper, SearchClient, TransportError};
pub use components::{
    Component, FacetField, FacetOptions, FacetPivot, FacetQuery, FacetRange, FilterQuery,
    GroupOptions, Grouping, HighlightOptions, PivotField, StatsField, make_fq,
};
pub use config::SearcherConfig;
pub use error::QueryError;
pub use expr::{Expr, Lookup, escape_query};
pub use local_params::{LocalParams, LocalValue};
pub use params::{ParamValue, WireParams};
pub use query::{SearchQuery, Slice};
pub use results::{
    Document, FacetFieldResult, FacetValue, RawFieldStats, RawPivot, RawResult, SearchResults,
};
pub use searcher::Searcher;
pub use value::{FieldType, NULL_TOKEN, Value};
