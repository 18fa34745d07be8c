//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - sheet geometry (`Pair2D`)
//! - fit records (`SymmetricGaussianParams`, `MLGaussianFit`, `MLFit`, `FitRecord`)
//! - run configuration (`TrackConfig`, `SampleConfig`)

pub mod types;

pub use types::*;
