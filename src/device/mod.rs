//! Device catalog.
//!
//! Device identity (brand, model, SDK, tags) keyed by codename, used to
//! homologate reports that arrive without build info.

pub mod info;
pub mod registry;

pub use info::*;
pub use registry::*;
