//! Neural populations on a twisted-torus sheet.

pub mod bump;
pub mod spikes;

pub use bump::SingleBumpPopulation;
pub use spikes::{SlidingRateSource, SlidingRates, TorusSpikes, window_starts};
