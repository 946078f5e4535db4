//! Handler routing.
//!
//! Decides which analysis handler processes each suite:
//! - `registry` - ordered descriptors, first-match-wins resolution, dispatch
//! - `handlers` - per-suite analysis state built once a handler is chosen

pub mod handlers;
pub mod registry;

pub use handlers::*;
pub use registry::*;
