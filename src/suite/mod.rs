//! Suites.
//!
//! A suite is every record of a report sharing one `suite_id`, plus derived
//! indices and the analysis handler bound to it by routing.

pub mod model;
pub mod partition;

pub use model::*;
pub use partition::*;
