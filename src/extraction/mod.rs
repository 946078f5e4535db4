//! Field extraction module.
//!
//! Flattening of free-form report payloads and tolerant value coercion.

pub mod coerce;
pub mod flatten;

pub use coerce::*;
pub use flatten::*;
