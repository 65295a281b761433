//! Configuration types
//!
//! Board-agnostic pin configuration and the registration records built
//! from it.

pub mod spec;
pub mod types;

pub use spec::*;
pub use types::*;
