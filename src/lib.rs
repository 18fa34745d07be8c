//! `bump-tracker` library crate.
//!
//! The binary (`bumps`) is a thin wrapper around this library so that:
//!
//! - the fitting core is testable without spawning processes
//! - the population/orchestration layer can be driven by other spike sources
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod population;
pub mod report;
