//! Bump model implementation.
//!
//! Kept as small, pure functions so that fitting and data generation can share
//! them.

pub mod model;

pub use model::*;
