//! Error types for the path codec and the subscription registry
//!
//! Handler and application plumbing errors use `anyhow`; these enums cover
//! the failures callers are expected to match on.

use thiserror::Error;

/// Errors raised while parsing or resolving a path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Wire string contained no segment at all
    #[error("path is empty")]
    Empty,

    /// Segment starts with `$` but names no known symbol
    #[error("unknown symbolic segment '{segment}' in {path}")]
    UnknownSymbol { segment: String, path: String },

    /// Symbolic segment whose session context is missing
    #[error("cannot resolve '{segment}' in {path}: {reason}")]
    Unresolved {
        segment: String,
        path: String,
        reason: String,
    },
}

/// Errors raised by the subscription registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Descriptor registered without a name
    #[error("subscription name cannot be empty")]
    EmptyName,

    /// Pattern is not a valid regular expression
    #[error("invalid pattern for subscription '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// Runtime watch tried to take the name of a catalog subscription
    #[error("subscription name '{name}' is reserved by the device catalog")]
    Reserved { name: String },
}
