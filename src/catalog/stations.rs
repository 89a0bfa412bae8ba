//! Loads the station reference table (`stations.csv`) and keeps the stations that passed
//! the quality filter.
//!
//! Expected columns (`;`-separated, header row): `num_poste`, `name`, `lat`, `lon`,
//! `alti`, `good` (`0`/`1` or `true`/`false`). Rows without coordinates are skipped.

use crate::catalog::error::CatalogError;
use crate::catalog::{read_reference_csv, require_columns, STATIONS_FILE_NAME};
use crate::types::station::Station;
use log::{debug, warn};
use polars::prelude::*;
use std::path::Path;

const COL_NUM_POSTE: &str = "num_poste";
const COL_NAME: &str = "name";
const COL_LAT: &str = "lat";
const COL_LON: &str = "lon";
const COL_ALTI: &str = "alti";
const COL_GOOD: &str = "good";

const REQUIRED_COLUMNS: [&str; 6] = [COL_NUM_POSTE, COL_NAME, COL_LAT, COL_LON, COL_ALTI, COL_GOOD];

/// Reads `stations.csv` from `data_dir` and returns only the stations flagged as good.
pub async fn load_good_stations(data_dir: &Path) -> Result<Vec<Station>, CatalogError> {
    let path = data_dir.join(STATIONS_FILE_NAME);
    let stations = tokio::task::spawn_blocking({
        let path = path.clone();
        move || read_stations(&path)
    })
    .await??;

    let total = stations.len();
    let good: Vec<Station> = stations.into_iter().filter(|s| s.good).collect();
    debug!(
        "{} of {} stations in {} passed the quality filter",
        good.len(),
        total,
        path.display()
    );
    Ok(good)
}

fn read_stations(path: &Path) -> Result<Vec<Station>, CatalogError> {
    let df = read_reference_csv(path)?;
    require_columns(&df, path, &REQUIRED_COLUMNS)?;
    stations_from_frame(df).map_err(|e| CatalogError::CsvRead {
        path: path.to_path_buf(),
        source: e,
    })
}

pub(crate) fn stations_from_frame(df: DataFrame) -> PolarsResult<Vec<Station>> {
    let df = df
        .lazy()
        .select([
            col(COL_NUM_POSTE).cast(DataType::Int64),
            col(COL_NAME).cast(DataType::String),
            col(COL_LAT).cast(DataType::Float64),
            col(COL_LON).cast(DataType::Float64),
            col(COL_ALTI).cast(DataType::Float64),
            col(COL_GOOD).cast(DataType::Boolean),
        ])
        .collect()?;

    let ids = df.column(COL_NUM_POSTE)?.i64()?;
    let names = df.column(COL_NAME)?.str()?;
    let lats = df.column(COL_LAT)?.f64()?;
    let lons = df.column(COL_LON)?.f64()?;
    let altis = df.column(COL_ALTI)?.f64()?;
    let goods = df.column(COL_GOOD)?.bool()?;

    let mut stations = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for i in 0..df.height() {
        let (Some(id), Some(latitude), Some(longitude)) = (ids.get(i), lats.get(i), lons.get(i))
        else {
            skipped += 1;
            continue;
        };
        stations.push(Station {
            id,
            name: names.get(i).unwrap_or_default().to_string(),
            latitude,
            longitude,
            altitude: altis.get(i),
            good: goods.get(i).unwrap_or(false),
        });
    }
    if skipped > 0 {
        warn!("Skipped {} station rows without identifier or coordinates", skipped);
    }
    Ok(stations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIONS_CSV: &str = "\
num_poste;name;lat;lon;alti;good
74056001;CHAMONIX;45.93;6.88;1042;1
74281001;ST-GERVAIS;45.89;6.71;810;1
75114001;PARIS-MONTSOURIS;48.82;2.34;75;1
13054001;MARIGNANE;43.44;5.22;9;0
99999999;NOWHERE;;;;1
";

    #[tokio::test]
    async fn test_load_good_stations_filters_quality() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(STATIONS_FILE_NAME), STATIONS_CSV)?;

        let stations = load_good_stations(dir.path()).await?;
        let ids: Vec<i64> = stations.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![74056001, 74281001, 75114001]);

        let chamonix = &stations[0];
        assert_eq!(chamonix.name, "CHAMONIX");
        assert_eq!(chamonix.altitude, Some(1042.0));
        assert!((chamonix.latitude - 45.93).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_good_stations_missing_column() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join(STATIONS_FILE_NAME),
            "num_poste;name;lat;lon;alti\n74056001;CHAMONIX;45.93;6.88;1042\n",
        )?;

        let result = load_good_stations(dir.path()).await;
        assert!(matches!(
            result,
            Err(CatalogError::MissingColumn {
                column: COL_GOOD,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_good_stations_missing_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let result = load_good_stations(dir.path()).await;
        assert!(matches!(result, Err(CatalogError::CsvRead { .. })));
        Ok(())
    }
}
