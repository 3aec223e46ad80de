//! awj-sync - state mirror and path-subscription dispatch for AWJ devices
//!
//! The device pushes `(path, value)` updates. A [`Session`] keeps them in a
//! [`StateMirror`], matches them against a [`Registry`] of named pattern
//! subscriptions and reports which reactions should re-run.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod path;
pub mod session;
pub mod sinks;
pub mod state;
pub mod subscription;

pub use catalog::{PathSchema, ProductFamily};
pub use error::{PathError, RegistryError};
pub use path::{Namespace, Path};
pub use session::{InitTarget, Outcome, Session, SessionHandle};
pub use sinks::{ReactionSink, VariableSink};
pub use state::{MirrorSnapshot, SessionSettings, StateMirror};
pub use subscription::{Descriptor, ReactionId, Registry};
