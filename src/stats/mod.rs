//! Frost-day reductions over the weather rows of a single station.

pub mod error;
pub mod station_frame;

pub use error::StatisticsError;
pub use station_frame::{DailyFrostProbability, StationFrame, YearlyFrostCount};
