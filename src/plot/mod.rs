//! Terminal plots of tracking results.

pub mod ascii;

pub use ascii::*;
