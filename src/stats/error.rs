use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("No weather rows for station {station_id}")]
    StationDataMissing { station_id: i64 },

    #[error("Failed computing frost statistics: {0}")]
    Polars(#[from] PolarsError),
}
