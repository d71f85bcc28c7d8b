//! Error types for query building and execution.

use thiserror::Error;

use crate::client::TransportError;

/// Errors surfaced by [`SearchQuery`](crate::SearchQuery).
///
/// Malformed request data never produces an error; only the transport and
/// misuse of the builder API do.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The search client failed. The underlying error is kept unchanged.
    #[error("search request failed: {0}")]
    Transport(#[source] TransportError),

    /// A dynamic parameter name is not among the recognized parameters.
    #[error("parameter not found: {name}")]
    ParameterNotFound { name: String },
}

impl QueryError {
    /// Returns true for [`QueryError::ParameterNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::ParameterNotFound { .. })
    }
}
