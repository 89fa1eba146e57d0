pub mod padded_average;
pub mod stats;

pub use padded_average::AdaptivePaddedAverage;
pub use stats::{GCStatistics, Stats};
