//! The entry point tying reference data, weather loading, memoization and statistics together.
//!
//! A [`FrostDashboard`] is created once per process. Reference data is loaded on first use
//! and kept for the lifetime of the dashboard; weather tables are memoized per
//! [`WeatherKey`] in a bounded LRU cache.

use crate::catalog::error::CatalogError;
use crate::catalog::{LocalReferenceSource, ReferenceData};
use crate::config::FrostConfig;
use crate::error::{FrostError, ReportError};
use crate::memo::CacheStats;
use crate::selection::{resolve_city, search_cities, search_cities_or_fail, SelectionError};
use crate::sources::{ReferenceSource, WeatherSource};
use crate::stats::{DailyFrostProbability, StationFrame, StatisticsError, YearlyFrostCount};
use crate::types::city::City;
use crate::types::department::DepartmentCode;
use crate::utils::ensure_dir_exists;
use crate::weather_data::data_loader::WeatherDataLoader;
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::frame_fetcher::FrameFetcher;
use crate::weather_data::key::{check_period, WeatherKey};
use bon::bon;
use log::{info, warn};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Everything shown for one selected city.
#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
    /// Every city name matching the search text, in table order.
    pub matches: Vec<String>,
    pub city: City,
    pub station_id: i64,
    pub station_name: Option<String>,
    pub department: DepartmentCode,
    pub altitude: Option<f64>,
    pub mean_frost_days: f64,
    pub frost_days_per_year: Vec<YearlyFrostCount>,
    pub frost_probability_per_day: Vec<DailyFrostProbability>,
    #[serde(skip)]
    pub observations: StationFrame,
}

/// The frost dashboard.
///
/// Create one with [`FrostDashboard::new()`] (configuration from the environment) or
/// [`FrostDashboard::with_config()`]. Tests and embedders can plug their own loaders in
/// with [`FrostDashboard::with_sources()`].
///
/// # Examples
///
/// ```no_run
/// # use winter_is_coming::{FrostDashboard, FrostError};
/// # #[tokio::main]
/// # async fn main() -> Result<(), FrostError> {
/// let dashboard = FrostDashboard::new().await?;
/// let reference = dashboard.static_data().await?;
///
/// let report = dashboard
///     .station_report()
///     .reference(&reference)
///     .query("chamonix")
///     .call()
///     .await?;
/// println!(
///     "{} ({}): {:.1} frost days per year",
///     report.city.name, report.station_id, report.mean_frost_days
/// );
/// # Ok(())
/// # }
/// ```
pub struct FrostDashboard<R = LocalReferenceSource, W = WeatherDataLoader> {
    config: FrostConfig,
    reference_source: R,
    static_data: OnceCell<Arc<ReferenceData>>,
    fetcher: FrameFetcher<W>,
}

impl FrostDashboard {
    /// Creates a dashboard configured from `FROST_*` environment variables.
    pub async fn new() -> Result<Self, FrostError> {
        Self::with_config(FrostConfig::from_env()).await
    }

    /// Creates a dashboard reading reference data from `config.data_dir` and caching
    /// weather files in `config.cache_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`FrostError::InvalidConfig`] if the configuration is inconsistent and
    /// [`FrostError::CacheDirCreation`] if the cache directory cannot be created.
    pub async fn with_config(config: FrostConfig) -> Result<Self, FrostError> {
        config.validate()?;
        ensure_dir_exists(&config.cache_dir)
            .await
            .map_err(|e| FrostError::CacheDirCreation(config.cache_dir.clone(), e))?;

        let reference_source = LocalReferenceSource::new(config.clone());
        let weather_source = WeatherDataLoader::new(&config);
        Ok(Self::with_sources(config, reference_source, weather_source))
    }

    /// Removes the downloaded department files from disk and forgets memoized tables.
    pub async fn clear_weather_cache(&self) -> Result<usize, WeatherDataError> {
        self.fetcher.clear().await;
        self.fetcher.source().clear_cache().await
    }
}

#[bon]
impl<R: ReferenceSource, W: WeatherSource> FrostDashboard<R, W> {
    pub fn with_sources(config: FrostConfig, reference_source: R, weather_source: W) -> Self {
        let capacity = config.weather_cache_capacity;
        Self {
            config,
            reference_source,
            static_data: OnceCell::new(),
            fetcher: FrameFetcher::new(weather_source, capacity),
        }
    }

    pub fn config(&self) -> &FrostConfig {
        &self.config
    }

    pub fn reference_source(&self) -> &R {
        &self.reference_source
    }

    pub fn weather_source(&self) -> &W {
        self.fetcher.source()
    }

    /// The good stations and linked cities, loaded on the first call.
    ///
    /// A failed load is not remembered: the next call tries again.
    pub async fn static_data(&self) -> Result<Arc<ReferenceData>, CatalogError> {
        self.static_data
            .get_or_try_init(|| async {
                info!("Loading reference data");
                self.reference_source.load().await.map(Arc::new)
            })
            .await
            .cloned()
    }

    /// The weather table of `department`, memoized per department, year range and threshold.
    ///
    /// Unset parameters fall back to the configuration. An inverted year range or a
    /// threshold outside `[0, 1]` gives [`WeatherDataError::InvalidRequest`].
    #[builder]
    pub async fn weather_data(
        &self,
        department: &DepartmentCode,
        start_year: Option<i32>,
        end_year: Option<i32>,
        completion_threshold: Option<f64>,
    ) -> Result<DataFrame, WeatherDataError> {
        let key = WeatherKey::new(
            department.clone(),
            start_year.unwrap_or(self.config.start_year),
            end_year.unwrap_or(self.config.end_year),
            completion_threshold.unwrap_or(self.config.completion_rate_threshold),
        );
        self.fetcher.get_weather_frame(&key).await
    }

    /// City names matching `text`, see [`search_cities`].
    pub async fn search(&self, text: &str) -> Result<Vec<String>, CatalogError> {
        let reference = self.static_data().await?;
        Ok(search_cities(&reference.cities, text))
    }

    /// Builds the report for a city picked from the results of searching `query`.
    ///
    /// `city` selects one of the matching names; the first match is used when it is unset.
    /// No weather data is requested when nothing matches.
    ///
    /// # Errors
    ///
    /// - [`ReportError::InvalidRequest`] when the year range is inverted or the threshold
    ///   is outside `[0, 1]`. Nothing is searched or loaded.
    /// - [`ReportError::NoCityMatch`] when the search yields nothing or `city` is not one
    ///   of its results.
    /// - [`ReportError::UpstreamLoadFailure`] when the department table cannot be loaded.
    /// - [`ReportError::StationDataMissing`] when the table has no rows for the station.
    #[builder]
    pub async fn station_report(
        &self,
        reference: &ReferenceData,
        query: &str,
        city: Option<&str>,
        start_year: Option<i32>,
        end_year: Option<i32>,
        completion_threshold: Option<f64>,
    ) -> Result<StationReport, ReportError> {
        let start_year = start_year.unwrap_or(self.config.start_year);
        let end_year = end_year.unwrap_or(self.config.end_year);
        let completion_threshold =
            completion_threshold.unwrap_or(self.config.completion_rate_threshold);
        check_period(start_year, end_year, completion_threshold)
            .map_err(ReportError::InvalidRequest)?;

        let matches = search_cities_or_fail(&reference.cities, query)?;
        let chosen = match city {
            Some(name) if matches.iter().any(|m| m == name) => name,
            Some(name) => {
                return Err(SelectionError::NoCityMatch {
                    query: name.to_string(),
                }
                .into())
            }
            None => matches[0].as_str(),
        };
        let city = resolve_city(&reference.cities, chosen)
            .cloned()
            .ok_or_else(|| SelectionError::NoCityMatch {
                query: chosen.to_string(),
            })?;

        let station_id = city.closest_station_id;
        let department = DepartmentCode::from_station_id(station_id);
        info!(
            "Building report for {} (station {}, department {})",
            city.name, station_id, department
        );

        let table = self
            .weather_data()
            .department(&department)
            .start_year(start_year)
            .end_year(end_year)
            .completion_threshold(completion_threshold)
            .call()
            .await
            .map_err(|source| ReportError::UpstreamLoadFailure {
                department: department.clone(),
                source,
            })?;

        let observations = match StationFrame::from_table(&table, station_id) {
            Ok(frame) => frame,
            Err(StatisticsError::StationDataMissing { station_id }) => {
                warn!(
                    "Department {} has {} rows but none for station {}",
                    department,
                    table.height(),
                    station_id
                );
                return Err(ReportError::StationDataMissing {
                    station_id,
                    department,
                });
            }
            Err(e) => return Err(ReportError::Statistics(e)),
        };

        Ok(StationReport {
            matches,
            station_id,
            station_name: observations
                .station_name()
                .map_err(ReportError::Statistics)?,
            department,
            altitude: observations.altitude().map_err(ReportError::Statistics)?,
            mean_frost_days: observations
                .mean_frost_days()
                .map_err(ReportError::Statistics)?,
            frost_days_per_year: observations
                .frost_days_per_year()
                .map_err(ReportError::Statistics)?,
            frost_probability_per_day: observations
                .frost_probability_per_day()
                .map_err(ReportError::Statistics)?,
            city,
            observations,
        })
    }

    /// Hit, miss and eviction counters of the weather table cache.
    pub async fn cache_stats(&self) -> CacheStats {
        self.fetcher.cache_stats().await
    }
}
