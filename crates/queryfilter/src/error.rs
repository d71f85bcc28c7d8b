//! Error types for filter declaration and raw parameter input.
//!
//! Request data never produces an error: malformed tokens are dropped while
//! decoding. Errors come from invalid declarations, structurally invalid raw
//! input and declaration files.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// An invalid filter or registry declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("filter name cannot be empty")]
    EmptyName,

    #[error("filter already declared: {name}")]
    DuplicateName { name: String },

    #[error("ordering filter already declared: {name}")]
    OrderingAlreadyDeclared { name: String },

    #[error("pivot filter {name} has no levels")]
    NoPivotLevels { name: String },

    #[error("facet query filter {name} has no values")]
    NoFacetQueryValues { name: String },

    #[error("ordering filter {name} has no values")]
    NoOrderingValues { name: String },

    #[error("filter {filter} declares value {value} more than once")]
    DuplicateValue { filter: String, value: String },

    #[error("ordering filter {filter} has unknown default: {value}")]
    UnknownDefault { filter: String, value: String },
}

/// Raw parameters whose top level is neither a mapping nor a pair sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid raw parameters: expected a mapping or a sequence of pairs, got {found}")]
    InvalidInput { found: String },
}

/// Errors loading declarations from JSON.
#[derive(Error, Debug)]
pub enum DeclarationFileError {
    #[error("failed to read declarations: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid declarations JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}
