//! # solar-queryfilter
//!
//! Turns raw request parameters into filtered, faceted [`SearchQuery`]s and
//! reconciles the engine response back into displayable filter values.
//!
//! ## Overview
//!
//! - [`SimpleCodec`] decodes raw parameters into typed [`Criterion`]s
//! - [`filters`] holds the filter kinds: plain, facet, facet query, range,
//!   pivot and ordering
//! - [`QueryFilter`] is the registry; [`QueryFilter::apply`] returns the
//!   derived query and a per-request [`Binding`]
//! - [`Binding::process_results`] fills every filter's [`FilterValue`]s
//!
//! Facets are multi-select: each facet excludes its own filter's tag, so a
//! selected value does not hide its siblings.
//!
//! ## Example
//!
//! ```rust,ignore
//! use solar_queryfilter::{FacetFilter, QueryFilter, RawParams};
//!
//! let registry = QueryFilter::new().with_filter(FacetFilter::new("region"))?;
//! let raw = RawParams::from_query_string("region=kiev");
//! let (query, mut binding) = registry.apply(&searcher.search_all(), &raw);
//! binding.process_results(query.results()?);
//! for value in binding.get_filter("region").unwrap().all_values() {
//!     println!("{} {}", value.title, value.count_plus);
//! }
//! ```
//!
//! [`SearchQuery`]: solar_query::SearchQuery

pub mod codec;
pub mod declaration;
pub mod error;
pub mod filters;
mod reconcile;
pub mod registry;
pub mod value;

pub use codec::{
    Criterion, Decoded, Operator, RawParams, RawValue, SimpleCodec, TypeSpec, ValueType,
};
pub use declaration::{Declarations, FilterDeclaration, OrderingDeclaration};
pub use error::{CodecError, DeclarationError, DeclarationFileError};
pub use filters::{
    Compiled, Direction, FacetFilter, FacetQueryFilter, FacetQueryValue, Filter, FilterSpec,
    OrderingFilter, OrderingValue, PivotFilter, PivotLevel, RangeFilter, Reconciled,
};
pub use registry::{Binding, BoundFilter, BoundOrdering, OrderingChoice, QueryFilter};
pub use value::{FilterValue, Mapper, TitleFn, count_plus};
