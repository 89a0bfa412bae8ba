mod catalog;
mod config;
mod dashboard;
mod error;
mod memo;
mod selection;
mod sources;
mod stats;
mod types;
mod utils;
mod weather_data;

pub use config::FrostConfig;
pub use dashboard::{FrostDashboard, StationReport};
pub use error::{FrostError, ReportError};

pub use catalog::error::CatalogError;
pub use catalog::{LocalReferenceSource, ReferenceData};
pub use memo::{CacheStats, LruCache};
pub use selection::{cities_named, resolve_city, search_cities, search_cities_or_fail, SelectionError};
pub use sources::{ReferenceSource, WeatherSource};
pub use stats::{DailyFrostProbability, StationFrame, StatisticsError, YearlyFrostCount};

pub use types::city::City;
pub use types::department::DepartmentCode;
pub use types::station::Station;

pub use weather_data::data_loader::WeatherDataLoader;
pub use weather_data::error::WeatherDataError;
pub use weather_data::key::WeatherKey;
pub use weather_data::processing::{prepare_weather_frame, WeatherFrameExt};
