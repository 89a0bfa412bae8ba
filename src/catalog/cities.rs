//! Loads the city reference table (`cities.csv`: `name`, `lat`, `lon`) and links every city
//! to its closest good station.
//!
//! Linking ~35k communes is done once; the linked table is stored with `bincode` in the
//! cache directory and reused while it is newer than both reference files and was built
//! from the same data directory and the same station set.

use crate::catalog::error::CatalogError;
use crate::catalog::{read_reference_csv, require_columns, CITIES_FILE_NAME, STATIONS_FILE_NAME};
use crate::types::city::City;
use crate::types::station::Station;
use bincode::config::{Configuration, Fixint, LittleEndian};
use haversine::{distance, Location as HaversineLocation, Units};
use log::{info, warn};
use polars::prelude::*;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;

const LINKED_CITIES_CACHE_FILE_NAME: &str = "cities_linked.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

const COL_NAME: &str = "name";
const COL_LAT: &str = "lat";
const COL_LON: &str = "lon";

// R-tree order is in degree space, the final pick uses haversine; look a bit further
// than the first hit so that longitude compression at French latitudes cannot mislead us.
const CANDIDATE_LIMIT: usize = 20;

/// What the bincode cache file holds: the linked cities and what they were linked from.
#[derive(Debug, Serialize, Deserialize)]
struct LinkedCitiesCache {
    data_dir: String,
    station_ids: Vec<i64>,
    cities: Vec<City>,
}

/// Nearest-station lookup over a fixed set of stations.
#[derive(Debug, Clone)]
pub struct StationLocator {
    rtree: RTree<Station>,
}

impl StationLocator {
    pub fn new(stations: &[Station]) -> Self {
        Self {
            rtree: RTree::bulk_load(stations.to_vec()),
        }
    }

    /// Closest station to a point and its great-circle distance in kilometers.
    pub fn closest(&self, latitude: f64, longitude: f64) -> Option<(&Station, f64)> {
        self.rtree
            .nearest_neighbor_iter(&[latitude, longitude])
            .take(CANDIDATE_LIMIT)
            .map(|station| {
                let origin = HaversineLocation {
                    latitude,
                    longitude,
                };
                let station_loc = HaversineLocation {
                    latitude: station.latitude,
                    longitude: station.longitude,
                };
                (station, distance(origin, station_loc, Units::Kilometers))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Returns the cities of `data_dir/cities.csv`, each linked to the closest of `stations`.
pub async fn load_linked_cities(
    data_dir: &Path,
    cache_dir: &Path,
    stations: &[Station],
) -> Result<Vec<City>, CatalogError> {
    let cities_path = data_dir.join(CITIES_FILE_NAME);
    let stations_path = data_dir.join(STATIONS_FILE_NAME);
    let cache_file = cache_dir.join(LINKED_CITIES_CACHE_FILE_NAME);

    if stations.is_empty() {
        return Err(CatalogError::NoGoodStations(stations_path));
    }

    let data_dir_key = canonical_dir(data_dir).await;
    let mut station_ids: Vec<i64> = stations.iter().map(|s| s.id).collect();
    station_ids.sort_unstable();

    if cache_is_fresh(&cache_file, &[cities_path.clone(), stations_path]) {
        let path = cache_file.clone();
        match tokio::task::spawn_blocking(move || read_cached_cities(&path)).await? {
            Ok(cache) if cache.data_dir == data_dir_key && cache.station_ids == station_ids => {
                info!(
                    "Loaded {} linked cities from cache {}",
                    cache.cities.len(),
                    cache_file.display()
                );
                return Ok(cache.cities);
            }
            Ok(_) => info!(
                "City cache {} belongs to other reference data, relinking",
                cache_file.display()
            ),
            Err(e) => warn!("Ignoring unreadable city cache: {}", e),
        }
    }

    let locator = StationLocator::new(stations);
    let cities = tokio::task::spawn_blocking(move || {
        let df = read_reference_csv(&cities_path)?;
        require_columns(&df, &cities_path, &[COL_NAME, COL_LAT, COL_LON])?;
        link_cities(df, &locator).map_err(|e| CatalogError::CsvRead {
            path: cities_path.clone(),
            source: e,
        })
    })
    .await??;

    tokio::fs::create_dir_all(cache_dir)
        .await
        .map_err(|e| CatalogError::CacheDirCreation(cache_dir.to_path_buf(), e))?;
    let cache = LinkedCitiesCache {
        data_dir: data_dir_key,
        station_ids,
        cities,
    };
    cache_cities(&cache, &cache_file).await?;
    Ok(cache.cities)
}

/// The data directory as stored in the cache, resolved when possible.
async fn canonical_dir(dir: &Path) -> String {
    tokio::fs::canonicalize(dir)
        .await
        .unwrap_or_else(|_| dir.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn link_cities(df: DataFrame, locator: &StationLocator) -> PolarsResult<Vec<City>> {
    let df = df
        .lazy()
        .select([
            col(COL_NAME).cast(DataType::String),
            col(COL_LAT).cast(DataType::Float64),
            col(COL_LON).cast(DataType::Float64),
        ])
        .collect()?;
    let names = df.column(COL_NAME)?.str()?;
    let lats = df.column(COL_LAT)?.f64()?;
    let lons = df.column(COL_LON)?.f64()?;

    let mut cities = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for i in 0..df.height() {
        let (Some(name), Some(latitude), Some(longitude)) = (names.get(i), lats.get(i), lons.get(i))
        else {
            skipped += 1;
            continue;
        };
        let Some((station, distance_km)) = locator.closest(latitude, longitude) else {
            skipped += 1;
            continue;
        };
        cities.push(City {
            name: name.to_string(),
            latitude,
            longitude,
            closest_station_id: station.id,
            distance_km,
        });
    }
    if skipped > 0 {
        warn!("Skipped {} city rows without name or coordinates", skipped);
    }
    Ok(cities)
}

fn cache_is_fresh(cache_file: &Path, sources: &[PathBuf]) -> bool {
    let modified = |path: &Path| -> Option<SystemTime> { std::fs::metadata(path).ok()?.modified().ok() };
    let Some(cached_at) = modified(cache_file) else {
        return false;
    };
    sources
        .iter()
        .all(|source| modified(source).is_some_and(|m| m <= cached_at))
}

fn read_cached_cities(cache_path: &Path) -> Result<LinkedCitiesCache, CatalogError> {
    let bytes = std::fs::read(cache_path)
        .map_err(|e| CatalogError::CacheRead(cache_path.to_path_buf(), e))?;
    let (cache, _) =
        bincode::serde::decode_from_slice::<LinkedCitiesCache, _>(&bytes, BINCODE_CONFIG)
            .map_err(|e| CatalogError::CacheDecode(cache_path.to_path_buf(), Box::new(e)))?;
    Ok(cache)
}

async fn cache_cities(cache: &LinkedCitiesCache, cache_path: &Path) -> Result<(), CatalogError> {
    let bytes = bincode::serde::encode_to_vec(cache, BINCODE_CONFIG)
        .map_err(|e| CatalogError::CacheEncode(Box::new(e)))?;
    let path = cache_path.to_path_buf();
    let written = bytes.len();
    tokio::task::spawn_blocking(move || {
        let write_err = |e| CatalogError::CacheWrite(path.clone(), e);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(dir).map_err(write_err)?;
        temp_file.write_all(&bytes).map_err(write_err)?;
        temp_file.persist(&path).map_err(|e| write_err(e.error))?;
        Ok::<(), CatalogError>(())
    })
    .await??;
    info!(
        "Wrote linked city cache ({} bytes) to {}",
        written,
        cache_path.display()
    );
    Ok(())
}
