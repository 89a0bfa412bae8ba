use crate::types::department::DepartmentCode;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherDataError {
    #[error("Invalid weather request: {0}")]
    InvalidRequest(String),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    // Errors during parquet writing (inside blocking task)
    #[error("I/O error writing parquet cache file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing parquet cache file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to scan parquet cache file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Data download or decompression failed")]
    DownloadIo(#[from] std::io::Error), // Handles stream errors, read_to_end

    // Errors during CSV reading (inside blocking task)
    #[error("I/O error processing CSV data for department '{department}'")]
    CsvReadIo {
        department: DepartmentCode,
        #[source]
        source: std::io::Error,
    },
    #[error("Parsing error processing CSV data for department '{department}'")]
    CsvReadPolars {
        department: DepartmentCode,
        #[source]
        source: PolarsError,
    },

    #[error("Missing required column '{column}' in weather data for department {department}")]
    MissingColumnError {
        department: DepartmentCode,
        column: &'static str,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Failed to delete cache '{0}'")]
    CacheDeletionError(PathBuf, #[source] std::io::Error),
}
