//! Per-snapshot estimators and their time-indexed result lists.
//!
//! - `gaussian`: circular Gaussian on the twisted torus (nonlinear least squares)
//! - `uniform`: constant rate under Gaussian noise (closed form)
//! - `lists`: `MLGaussianFitList` / `MLFitList`

pub mod gaussian;
pub mod lists;
pub mod uniform;

pub use gaussian::*;
pub use lists::*;
pub use uniform::*;
