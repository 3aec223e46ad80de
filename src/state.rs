//! State management module - mirror of the device tree plus local client state
//!
//! The mirror keeps the last value seen for every path the device reported,
//! and a parallel local namespace for selection, lock flags and the socket
//! identity. Writes never notify anyone: the session dispatches the same
//! `(path, value)` pair after updating the mirror.

mod context;
mod mirror;
mod snapshot;

pub use context::{local, MirrorContext, SessionSettings};
pub use mirror::StateMirror;
pub use snapshot::MirrorSnapshot;
