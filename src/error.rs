use crate::catalog::error::CatalogError;
use crate::selection::SelectionError;
use crate::stats::error::StatisticsError;
use crate::types::department::DepartmentCode;
use crate::weather_data::error::WeatherDataError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrostError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    WeatherData(#[from] WeatherDataError),

    #[error(transparent)]
    Statistics(#[from] StatisticsError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to serialize output")]
    Serialization(#[from] serde_json::Error),
}

/// Why a station report could not be produced.
///
/// These are per-request failures: the dashboard stays usable for other cities.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid report request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    NoCityMatch(#[from] SelectionError),

    #[error(
        "Weather data was found for department {department}, but not for station {station_id}"
    )]
    StationDataMissing {
        station_id: i64,
        department: DepartmentCode,
    },

    #[error("Failed to load weather data for department {department}")]
    UpstreamLoadFailure {
        department: DepartmentCode,
        #[source]
        source: WeatherDataError,
    },

    #[error("Failed to compute frost statistics")]
    Statistics(#[source] StatisticsError),
}
