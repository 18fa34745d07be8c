//! Synthetic spike data.

pub mod sample;

pub use sample::*;
