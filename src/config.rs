//! Runtime configuration: where reference and weather data live, which years are analysed
//! and how strict the completeness filter is.

use crate::error::FrostError;
use crate::utils::{default_cache_dir, default_data_dir};
use crate::weather_data::key::check_period;
use bon::Builder;
use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_START_YEAR: i32 = 1991;
pub const DEFAULT_END_YEAR: i32 = 2023;
pub const DEFAULT_COMPLETION_RATE_THRESHOLD: f64 = 0.9;
pub const DEFAULT_FROST_THRESHOLD_CELSIUS: f64 = 0.0;
pub const DEFAULT_WEATHER_CACHE_CAPACITY: usize = 32;
pub const DEFAULT_WEATHER_BASE_URL: &str =
    "https://object.files.data.gouv.fr/meteofrance/data/synchro_ftp/BASE/QUOT";

/// Configuration of a [`crate::FrostDashboard`].
///
/// Every field has a default, so `FrostConfig::builder().build()` is a complete
/// configuration. [`FrostConfig::from_env`] starts from the same defaults and applies
/// `FROST_*` environment variables on top.
///
/// # Examples
///
/// ```
/// use winter_is_coming::FrostConfig;
///
/// let config = FrostConfig::builder()
///     .data_dir("/tmp/frost/data")
///     .start_year(2000)
///     .end_year(2020)
///     .completion_rate_threshold(0.8)
///     .build();
/// assert_eq!(config.start_year, 2000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct FrostConfig {
    /// Directory holding the reference tables (`stations.csv`, `cities.csv`).
    /// Its absence triggers the one-time reference download.
    #[builder(into, default = default_data_dir())]
    pub data_dir: PathBuf,
    /// Directory for downloaded weather files (parquet) and the linked city table.
    #[builder(into, default = default_cache_dir())]
    pub cache_dir: PathBuf,
    /// First year analysed (inclusive).
    #[builder(default = DEFAULT_START_YEAR)]
    pub start_year: i32,
    /// Last year analysed (inclusive).
    #[builder(default = DEFAULT_END_YEAR)]
    pub end_year: i32,
    /// Minimum fraction of observed days for a station-year to be kept, in `[0, 1]`.
    #[builder(default = DEFAULT_COMPLETION_RATE_THRESHOLD)]
    pub completion_rate_threshold: f64,
    /// A day is a frost day when its minimum temperature is at or below this value.
    #[builder(default = DEFAULT_FROST_THRESHOLD_CELSIUS)]
    pub frost_threshold_celsius: f64,
    /// Number of department tables kept in memory.
    #[builder(default = DEFAULT_WEATHER_CACHE_CAPACITY)]
    pub weather_cache_capacity: usize,
    /// Base URL of the Météo-France daily files (`Q_{dep}_previous-...csv.gz`).
    #[builder(into, default = DEFAULT_WEATHER_BASE_URL.to_string())]
    pub weather_base_url: String,
    /// Where to download the station reference table from, if the data directory is missing.
    #[builder(into)]
    pub stations_url: Option<String>,
    /// Where to download the city reference table from, if the data directory is missing.
    #[builder(into)]
    pub cities_url: Option<String>,
}

impl Default for FrostConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FrostConfig {
    /// Builds a configuration from the defaults overridden by environment variables.
    ///
    /// # Environment Variables
    /// - `FROST_DATA_DIR`, `FROST_CACHE_DIR` - paths
    /// - `FROST_START_YEAR`, `FROST_END_YEAR` - analysed period
    /// - `FROST_COMPLETION_RATE_THRESHOLD` - completeness filter
    /// - `FROST_THRESHOLD_CELSIUS` - frost day threshold
    /// - `FROST_WEATHER_CACHE_CAPACITY` - in-memory department tables
    /// - `FROST_WEATHER_BASE_URL`, `FROST_STATIONS_URL`, `FROST_CITIES_URL` - download sources
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env::var("FROST_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cache_dir: env::var("FROST_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            start_year: parse_env("FROST_START_YEAR").unwrap_or(defaults.start_year),
            end_year: parse_env("FROST_END_YEAR").unwrap_or(defaults.end_year),
            completion_rate_threshold: parse_env("FROST_COMPLETION_RATE_THRESHOLD")
                .unwrap_or(defaults.completion_rate_threshold),
            frost_threshold_celsius: parse_env("FROST_THRESHOLD_CELSIUS")
                .unwrap_or(defaults.frost_threshold_celsius),
            weather_cache_capacity: parse_env("FROST_WEATHER_CACHE_CAPACITY")
                .unwrap_or(defaults.weather_cache_capacity),
            weather_base_url: env::var("FROST_WEATHER_BASE_URL")
                .unwrap_or(defaults.weather_base_url),
            stations_url: env::var("FROST_STATIONS_URL").ok().or(defaults.stations_url),
            cities_url: env::var("FROST_CITIES_URL").ok().or(defaults.cities_url),
        }
    }

    /// Checks the relations between fields that the builder cannot express.
    pub fn validate(&self) -> Result<(), FrostError> {
        check_period(
            self.start_year,
            self.end_year,
            self.completion_rate_threshold,
        )
        .map_err(FrostError::InvalidConfig)?;
        if self.weather_cache_capacity == 0 {
            return Err(FrostError::InvalidConfig(
                "weather cache capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = FrostConfig::default();
        assert_eq!(config.start_year, DEFAULT_START_YEAR);
        assert_eq!(config.end_year, DEFAULT_END_YEAR);
        assert_eq!(config.completion_rate_threshold, 0.9);
        assert_eq!(config.frost_threshold_celsius, 0.0);
        assert_eq!(config.weather_cache_capacity, 32);
        assert!(config.stations_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_inverted_years() {
        let config = FrostConfig::builder().start_year(2020).end_year(2010).build();
        assert!(matches!(
            config.validate(),
            Err(FrostError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_rejects_threshold_out_of_range() {
        let config = FrostConfig::builder()
            .completion_rate_threshold(1.5)
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_empty_cache() {
        let config = FrostConfig::builder().weather_cache_capacity(0).build();
        assert!(config.validate().is_err());
    }
}
