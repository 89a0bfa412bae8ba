//! Reference data: the quality-filtered station list and the city list linked to it.

pub mod cities;
pub mod error;
pub mod ingest;
pub mod stations;

use crate::catalog::error::CatalogError;
use crate::config::FrostConfig;
use crate::sources::ReferenceSource;
use crate::types::city::City;
use crate::types::station::Station;
use log::info;
use polars::prelude::*;
use std::path::Path;

pub const STATIONS_FILE_NAME: &str = "stations.csv";
pub const CITIES_FILE_NAME: &str = "cities.csv";

/// The static tables every request reads from: good stations and linked cities.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub stations: Vec<Station>,
    pub cities: Vec<City>,
}

impl ReferenceData {
    pub fn station(&self, station_id: i64) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == station_id)
    }
}

/// Loads [`ReferenceData`] from the local data directory, downloading it first if the
/// directory does not exist yet.
#[derive(Debug, Clone)]
pub struct LocalReferenceSource {
    config: FrostConfig,
}

impl LocalReferenceSource {
    pub fn new(config: FrostConfig) -> Self {
        Self { config }
    }
}

impl ReferenceSource for LocalReferenceSource {
    async fn load(&self) -> Result<ReferenceData, CatalogError> {
        ingest::ensure_reference_data(&self.config).await?;
        let stations = stations::load_good_stations(&self.config.data_dir).await?;
        let cities =
            cities::load_linked_cities(&self.config.data_dir, &self.config.cache_dir, &stations)
                .await?;
        info!(
            "Loaded {} good stations and {} cities",
            stations.len(),
            cities.len()
        );
        Ok(ReferenceData { stations, cities })
    }
}

/// Reads a `;`-separated reference table with a header row.
///
/// The whole file is used for schema inference so sparse columns are not mistyped.
pub(crate) fn read_reference_csv(path: &Path) -> Result<DataFrame, CatalogError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_separator(b';'))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| CatalogError::CsvRead {
            path: path.to_path_buf(),
            source: e,
        })
}

pub(crate) fn require_columns(
    df: &DataFrame,
    path: &Path,
    columns: &[&'static str],
) -> Result<(), CatalogError> {
    match columns
        .iter()
        .find(|column| df.get_column_index(column).is_none())
    {
        Some(column) => Err(CatalogError::MissingColumn {
            path: path.to_path_buf(),
            column: *column,
        }),
        None => Ok(()),
    }
}
