//! Input/output helpers.
//!
//! - spike CSV ingest + validation (`ingest`)
//! - per-window CSV export (`export`)
//! - track JSON read/write (`track`)

pub mod export;
pub mod ingest;
pub mod track;

pub use export::*;
pub use ingest::*;
pub use track::*;
