//! Subscription module - named path patterns bound to reactions and handlers
//!
//! A subscription matches incoming wire paths with a regular expression,
//! surfaces zero or more reaction ids to the caller and optionally runs a
//! handler that updates local state or display variables. Capturing groups
//! mark the wildcard segments a seed enumerates during initialization.

mod descriptor;
pub mod pattern;
mod registry;

pub use descriptor::{
    Descriptor, Handler, Origin, ReactionId, Scope, Seed, SeedFn, Subscription, Update,
};
pub use registry::Registry;
