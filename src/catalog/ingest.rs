//! One-time download of the reference tables into the local data directory.
//!
//! The presence of the data directory is the only guard: when it exists nothing is
//! downloaded. Files are staged in a temporary sibling directory and moved into place in
//! one rename, so an interrupted download never leaves a half-filled data directory that
//! would suppress the next attempt.

use crate::catalog::error::CatalogError;
use crate::catalog::{CITIES_FILE_NAME, STATIONS_FILE_NAME};
use crate::config::FrostConfig;
use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use std::io;
use std::path::Path;
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;

/// Downloads the reference tables unless `config.data_dir` already exists.
pub async fn ensure_reference_data(config: &FrostConfig) -> Result<(), CatalogError> {
    if config.data_dir.exists() {
        debug!(
            "Data directory {} present, skipping reference download",
            config.data_dir.display()
        );
        return Ok(());
    }
    info!(
        "Data directory {} not found. Downloading reference data.",
        config.data_dir.display()
    );
    download_reference_data(config).await
}

async fn download_reference_data(config: &FrostConfig) -> Result<(), CatalogError> {
    let stations_url =
        config
            .stations_url
            .as_deref()
            .ok_or(CatalogError::MissingSource {
                file: STATIONS_FILE_NAME,
                env_var: "FROST_STATIONS_URL",
            })?;
    let cities_url = config
        .cities_url
        .as_deref()
        .ok_or(CatalogError::MissingSource {
            file: CITIES_FILE_NAME,
            env_var: "FROST_CITIES_URL",
        })?;

    let parent = config
        .data_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| CatalogError::DataDirCreation(parent.to_path_buf(), e))?;
    let staging = tempfile::Builder::new()
        .prefix(".frost-ingest-")
        .tempdir_in(parent)
        .map_err(|e| CatalogError::DataDirCreation(parent.to_path_buf(), e))?;

    let client = Client::new();
    download_to(&client, stations_url, &staging.path().join(STATIONS_FILE_NAME)).await?;
    download_to(&client, cities_url, &staging.path().join(CITIES_FILE_NAME)).await?;

    // On failure `staging` is dropped and removes itself.
    tokio::fs::rename(staging.path(), &config.data_dir)
        .await
        .map_err(|e| CatalogError::DataDirCreation(config.data_dir.clone(), e))?;
    let _ = staging.keep();
    info!("Reference data ready in {}", config.data_dir.display());
    Ok(())
}

/// Fetches `url` into `dest`, gunzipping on the fly when the URL ends in `.gz`.
async fn download_to(client: &Client, url: &str, dest: &Path) -> Result<(), CatalogError> {
    info!("Downloading {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CatalogError::NetworkRequest(url.to_string(), e))?;
    let response = match response.error_for_status() {
        Ok(resp) => resp,
        Err(e) => {
            warn!("HTTP error for {}: {:?}", url, e);
            return Err(if let Some(status) = e.status() {
                CatalogError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                }
            } else {
                CatalogError::NetworkRequest(url.to_string(), e)
            });
        }
    };

    let stream = response.bytes_stream().map_err(io::Error::other);
    let mut reader = BufReader::new(StreamReader::new(stream));
    let mut contents = Vec::new();
    if url.ends_with(".gz") {
        GzipDecoder::new(reader).read_to_end(&mut contents).await?;
    } else {
        reader.read_to_end(&mut contents).await?;
    }

    tokio::fs::write(dest, &contents)
        .await
        .map_err(|e| CatalogError::FileWrite(dest.to_path_buf(), e))?;
    debug!("Wrote {} bytes to {}", contents.len(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::http_fixture::{gzip, serve};

    #[tokio::test]
    async fn test_existing_data_dir_skips_download() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        // no URLs configured: any download attempt would fail with MissingSource
        let config = FrostConfig::builder().data_dir(root.path()).build();
        ensure_reference_data(&config).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_source_leaves_no_data_dir() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let data_dir = root.path().join("data");
        let config = FrostConfig::builder().data_dir(&data_dir).build();

        let result = ensure_reference_data(&config).await;
        assert!(matches!(
            result,
            Err(CatalogError::MissingSource {
                file: STATIONS_FILE_NAME,
                ..
            })
        ));
        assert!(!data_dir.exists());
        Ok(())
    }

    const STATIONS_CSV: &str = "num_poste;name;lat;lon;alti;good\n74056001;CHAMONIX;45.93;6.88;1042;1\n";
    const CITIES_CSV: &str = "name;lat;lon\nChamonix-Mont-Blanc;45.92;6.87\n";

    fn staging_leftovers(parent: &Path) -> std::io::Result<Vec<String>> {
        Ok(std::fs::read_dir(parent)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".frost-ingest-"))
            .collect())
    }

    #[tokio::test]
    async fn test_download_plain_and_gzipped_tables() -> Result<(), Box<dyn std::error::Error>> {
        let base_url = serve(vec![
            ("/stations.csv", STATIONS_CSV.as_bytes().to_vec()),
            ("/cities.csv.gz", gzip(CITIES_CSV.as_bytes()).await?),
        ])
        .await?;
        let root = tempfile::tempdir()?;
        let data_dir = root.path().join("data");
        let config = FrostConfig::builder()
            .data_dir(&data_dir)
            .stations_url(format!("{}/stations.csv", base_url))
            .cities_url(format!("{}/cities.csv.gz", base_url))
            .build();

        ensure_reference_data(&config).await?;

        assert_eq!(
            std::fs::read_to_string(data_dir.join(STATIONS_FILE_NAME))?,
            STATIONS_CSV
        );
        assert_eq!(
            std::fs::read_to_string(data_dir.join(CITIES_FILE_NAME))?,
            CITIES_CSV
        );
        assert!(staging_leftovers(root.path())?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_second_download_leaves_no_data_dir(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let base_url = serve(vec![("/stations.csv", STATIONS_CSV.as_bytes().to_vec())]).await?;
        let root = tempfile::tempdir()?;
        let data_dir = root.path().join("data");
        let config = FrostConfig::builder()
            .data_dir(&data_dir)
            .stations_url(format!("{}/stations.csv", base_url))
            .cities_url(format!("{}/missing.csv", base_url))
            .build();

        let result = ensure_reference_data(&config).await;
        assert!(matches!(
            result,
            Err(CatalogError::HttpStatus { status, .. }) if status == reqwest::StatusCode::NOT_FOUND
        ));
        assert!(!data_dir.exists());
        assert!(staging_leftovers(root.path())?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_rename_removes_staging() -> Result<(), Box<dyn std::error::Error>> {
        let base_url = serve(vec![
            ("/stations.csv", STATIONS_CSV.as_bytes().to_vec()),
            ("/cities.csv", CITIES_CSV.as_bytes().to_vec()),
        ])
        .await?;
        let root = tempfile::tempdir()?;
        let data_dir = root.path().join("data");
        // a non-empty directory in the way makes the rename fail
        std::fs::create_dir(&data_dir)?;
        std::fs::write(data_dir.join("other"), b"x")?;
        let config = FrostConfig::builder()
            .data_dir(&data_dir)
            .stations_url(format!("{}/stations.csv", base_url))
            .cities_url(format!("{}/cities.csv", base_url))
            .build();

        let result = download_reference_data(&config).await;
        assert!(matches!(result, Err(CatalogError::DataDirCreation(..))));
        assert!(staging_leftovers(root.path())?.is_empty());
        Ok(())
    }
}
