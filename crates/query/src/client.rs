//! Collaborators consumed by the query builder: the search client and the
//! instance mapper.

use std::collections::HashMap;
use std::sync::Arc;

use crate::params::WireParams;
use crate::results::RawResult;
use crate::value::Value;

/// Error returned by a [`SearchClient`], surfaced as
/// [`QueryError::Transport`](crate::QueryError::Transport).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Blocking access to a search engine's select handler.
///
/// Retries, timeouts and connection handling belong to the implementation.
pub trait SearchClient: Send + Sync {
    /// Executes one select request.
    fn select(&self, q: &str, params: &WireParams) -> Result<RawResult, TransportError>;
}

impl<T: SearchClient + ?Sized> SearchClient for Arc<T> {
    fn select(&self, q: &str, params: &WireParams) -> Result<RawResult, TransportError> {
        (**self).select(q, params)
    }
}

impl<T: SearchClient + ?Sized> SearchClient for Box<T> {
    fn select(&self, q: &str, params: &WireParams) -> Result<RawResult, TransportError> {
        (**self).select(q, params)
    }
}

/// Maps identifiers to application objects in one batch.
///
/// The returned map is keyed by the text form of each identifier
/// (`Value::to_string`). Identifiers without an object are left out.
pub trait InstanceMapper: Send + Sync {
    fn map_many(&self, ids: &[Value]) -> HashMap<String, serde_json::Value>;
}

impl<F> InstanceMapper for F
where
    F: Fn(&[Value]) -> HashMap<String, serde_json::Value> + Send + Sync,
{
    fn map_many(&self, ids: &[Value]) -> HashMap<String, serde_json::Value> {
        self(ids)
    }
}
