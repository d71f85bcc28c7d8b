//! Query components that contribute request parameters.
//!
//! Each component writes its own parameters into the prepared [`WireParams`];
//! repeated parameters (`facet.field`, `fq`, ...) accumulate and switches
//! (`facet=true`, `group=true`) are set once.

mod facet;
mod group;
mod stats;

use std::fmt;

pub use facet::{FacetField, FacetOptions, FacetPivot, FacetQuery, FacetRange, PivotField};
pub use group::{GroupOptions, Grouping};
pub use stats::{HighlightOptions, StatsField};

use crate::expr::Expr;
use crate::local_params::LocalParams;
use crate::params::WireParams;

/// One `fq` entry: an expression and its local params.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterQuery {
    pub expr: Expr,
    pub local_params: LocalParams,
}

impl FilterQuery {
    pub fn new(expr: Expr, local_params: LocalParams) -> Self {
        Self { expr, local_params }
    }
}

impl From<Expr> for FilterQuery {
    fn from(expr: Expr) -> Self {
        Self::new(expr, LocalParams::new())
    }
}

impl fmt::Display for FilterQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.local_params, self.expr)
    }
}

/// Renders an `fq` value: the local params prefix followed by the expression.
pub fn make_fq(expr: &Expr, local_params: &LocalParams) -> String {
    local_params.prefix(&expr.to_string())
}

/// A component that can be attached to a query as a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    FacetField(FacetField),
    FacetQuery(FacetQuery),
    FacetRange(FacetRange),
    FacetPivot(FacetPivot),
    Stats(StatsField),
    Group(Grouping),
}

impl Component {
    pub fn write_params(&self, params: &mut WireParams) {
        match self {
            Component::FacetField(facet) => facet.write_params(params),
            Component::FacetQuery(facet) => facet.write_params(params),
            Component::FacetRange(facet) => facet.write_params(params),
            Component::FacetPivot(facet) => facet.write_params(params),
            Component::Stats(stats) => stats.write_params(params),
            Component::Group(grouping) => grouping.write_params(params),
        }
    }
}

impl From<FacetField> for Component {
    fn from(facet: FacetField) -> Self {
        Component::FacetField(facet)
    }
}

impl From<FacetQuery> for Component {
    fn from(facet: FacetQuery) -> Self {
        Component::FacetQuery(facet)
    }
}

impl From<FacetRange> for Component {
    fn from(facet: FacetRange) -> Self {
        Component::FacetRange(facet)
    }
}

impl From<FacetPivot> for Component {
    fn from(facet: FacetPivot) -> Self {
        Component::FacetPivot(facet)
    }
}

impl From<StatsField> for Component {
    fn from(stats: StatsField) -> Self {
        Component::Stats(stats)
    }
}

impl From<Grouping> for Component {
    fn from(grouping: Grouping) -> Self {
        Component::Group(grouping)
    }
}
