use crate::config::FrostConfig;
use crate::sources::WeatherSource;
use crate::types::department::DepartmentCode;
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::key::WeatherKey;
use crate::weather_data::processing::{
    prepare_weather_frame, COL_ALTI, COL_RAW_DATE, COL_STATION_ID, COL_STATION_NAME, COL_TMIN,
};
use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use polars::frame::DataFrame;
use polars::prelude::*;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

const CACHE_FILE_PREFIX: &str = "quot-";
const DEPARTMENT_FILE_PERIOD: &str = "previous-1950-2023_RR-T-Vent";

// Météo-France daily base column names
const RAW_NUM_POSTE: &str = "NUM_POSTE";
const RAW_NOM_USUEL: &str = "NOM_USUEL";
const RAW_ALTI: &str = "ALTI";
const RAW_DATE: &str = "AAAAMMJJ";
const RAW_TN: &str = "TN";

pub struct WeatherDataLoader {
    cache_dir: PathBuf,
    base_url: String,
    frost_threshold_celsius: f64,
    download_client: Client,
}

impl WeatherDataLoader {
    pub fn new(config: &FrostConfig) -> WeatherDataLoader {
        WeatherDataLoader {
            cache_dir: config.cache_dir.clone(),
            base_url: config.weather_base_url.trim_end_matches('/').to_string(),
            frost_threshold_celsius: config.frost_threshold_celsius,
            download_client: Client::new(),
        }
    }

    /// URL of the Météo-France daily file for a department.
    pub fn department_url(&self, department: &DepartmentCode) -> String {
        format!(
            "{}/Q_{}_{}.csv.gz",
            self.base_url, department, DEPARTMENT_FILE_PERIOD
        )
    }

    fn cache_path(&self, department: &DepartmentCode) -> PathBuf {
        self.cache_dir
            .join(format!("{}{}.parquet", CACHE_FILE_PREFIX, department))
    }

    /// Loads the raw daily table of a department.
    /// Handles caching and downloading. Returns a LazyFrame over the cached parquet file.
    pub async fn get_frame(
        &self,
        department: &DepartmentCode,
    ) -> Result<LazyFrame, WeatherDataError> {
        let parquet_path = self.cache_path(department);

        if fs::metadata(&parquet_path).await.is_ok() {
            info!(
                "Cache hit for department {} at {:?}",
                department, parquet_path
            );
        } else {
            warn!(
                "Cache miss for department {}. Downloading and processing.",
                department
            );
            let raw_bytes = self.download(department).await?;
            let df = Self::csv_to_dataframe(raw_bytes, department).await?;

            fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(|e| WeatherDataError::CacheDirCreation(self.cache_dir.clone(), e))?;

            Self::cache_dataframe(df, &parquet_path).await?;
            info!(
                "Cached daily data for department {} to {:?}",
                department, parquet_path
            );
        }

        LazyFrame::scan_parquet(&parquet_path, Default::default())
            .map_err(|e| WeatherDataError::ParquetScan(parquet_path.clone(), e))
    }

    /// Downloads and decompresses the daily file of a department.
    async fn download(&self, department: &DepartmentCode) -> Result<Vec<u8>, WeatherDataError> {
        let url = self.department_url(department);
        info!("Downloading data from {}", url);

        let response = self
            .download_client
            .get(&url)
            .send()
            .await
            .map_err(|e| WeatherDataError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    WeatherDataError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    WeatherDataError::NetworkRequest(url, e)
                });
            }
        };

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let stream_reader = StreamReader::new(stream);
        let mut decoder = GzipDecoder::new(stream_reader);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .await
            .map_err(WeatherDataError::DownloadIo)?;
        info!(
            "Successfully downloaded and decompressed {} bytes for department {}",
            decompressed.len(),
            department
        );
        Ok(decompressed)
    }

    /// Parses raw CSV bytes into the raw department table using a blocking task.
    async fn csv_to_dataframe(
        bytes: Vec<u8>,
        department: &DepartmentCode,
    ) -> Result<DataFrame, WeatherDataError> {
        let department = department.clone();

        task::spawn_blocking(move || {
            let mut temp_file =
                NamedTempFile::new().map_err(|e| WeatherDataError::CsvReadIo {
                    department: department.clone(),
                    source: e,
                })?;
            temp_file
                .write_all(&bytes)
                .and_then(|_| temp_file.flush())
                .map_err(|e| WeatherDataError::CsvReadIo {
                    department: department.clone(),
                    source: e,
                })?;

            parse_department_csv(temp_file.path(), &department)
        })
        .await?
    }

    /// Writes a DataFrame to a Parquet file asynchronously using spawn_blocking.
    /// The file is written next to `path` and renamed into place once complete.
    async fn cache_dataframe(mut df: DataFrame, path: &Path) -> Result<(), WeatherDataError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let dir = path_buf
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let mut temp_file = NamedTempFile::new_in(dir)
                .map_err(|e| WeatherDataError::ParquetWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(temp_file.as_file_mut())
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| WeatherDataError::ParquetWritePolars(path_buf.clone(), e))?;
            temp_file
                .persist(&path_buf)
                .map_err(|e| WeatherDataError::ParquetWriteIo(path_buf.clone(), e.error))?;
            Ok::<(), WeatherDataError>(())
        })
        .await??;
        Ok(())
    }

    /// Removes the cached file of a department so the next load downloads it again.
    async fn discard_cache_file(&self, department: &DepartmentCode) {
        let path = self.cache_path(department);
        match fs::remove_file(&path).await {
            Ok(()) => warn!("Removed unreadable cache file {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove unreadable cache file {:?}: {}", path, e),
        }
    }

    /// Deletes every cached department file. Returns how many were removed.
    pub async fn clear_cache(&self) -> Result<usize, WeatherDataError> {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(WeatherDataError::CacheDeletionError(self.cache_dir.clone(), e)),
        };
        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WeatherDataError::CacheDeletionError(self.cache_dir.clone(), e))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(CACHE_FILE_PREFIX) && name.ends_with(".parquet") {
                let path = entry.path();
                fs::remove_file(&path)
                    .await
                    .map_err(|e| WeatherDataError::CacheDeletionError(path.clone(), e))?;
                debug!("Removed {:?}", path);
                removed += 1;
            }
        }
        info!("Removed {} cached department files", removed);
        Ok(removed)
    }
}

impl WeatherDataLoader {
    async fn load_prepared(&self, key: &WeatherKey) -> Result<DataFrame, WeatherDataError> {
        let raw = self.get_frame(&key.department).await?;
        let prepared = prepare_weather_frame(raw, key, self.frost_threshold_celsius);
        let df = task::spawn_blocking(move || prepared.collect()).await??;
        info!("Loaded {} observation rows for {}", df.height(), key);
        Ok(df)
    }
}

impl WeatherSource for WeatherDataLoader {
    async fn load(&self, key: &WeatherKey) -> Result<DataFrame, WeatherDataError> {
        let result = self.load_prepared(key).await;
        // A cache file that cannot be scanned would fail every later load.
        if let Err(WeatherDataError::ParquetScan(..) | WeatherDataError::DataFrameProcessing(_)) =
            &result
        {
            self.discard_cache_file(&key.department).await;
        }
        result
    }
}

/// Reads a `;`-separated Météo-France daily file and keeps the columns the pipeline uses,
/// renamed and typed as described in [`crate::weather_data::processing`].
pub(crate) fn parse_department_csv(
    path: &Path,
    department: &DepartmentCode,
) -> Result<DataFrame, WeatherDataError> {
    let polars_err = |e| WeatherDataError::CsvReadPolars {
        department: department.clone(),
        source: e,
    };

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_separator(b';'))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(polars_err)?
        .finish()
        .map_err(polars_err)?;

    for column in [RAW_NUM_POSTE, RAW_NOM_USUEL, RAW_ALTI, RAW_DATE, RAW_TN] {
        if df.get_column_index(column).is_none() {
            return Err(WeatherDataError::MissingColumnError {
                department: department.clone(),
                column,
            });
        }
    }

    df.lazy()
        .select([
            col(RAW_NUM_POSTE).cast(DataType::Int64).alias(COL_STATION_ID),
            col(RAW_NOM_USUEL)
                .cast(DataType::String)
                .alias(COL_STATION_NAME),
            col(RAW_ALTI).cast(DataType::Float64).alias(COL_ALTI),
            col(RAW_DATE).cast(DataType::Int64).alias(COL_RAW_DATE),
            col(RAW_TN).cast(DataType::Float64).alias(COL_TMIN),
        ])
        .collect()
        .map_err(polars_err)
}
