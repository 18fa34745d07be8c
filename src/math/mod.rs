//! Mathematical utilities: torus geometry, linear and nonlinear least squares.

pub mod lm;
pub mod ols;
pub mod torus;

pub use lm::*;
pub use ols::*;
pub use torus::*;
