//! The two loaders the dashboard memoizes.
//!
//! [`crate::FrostDashboard`] owns one implementation of each and never calls them twice
//! for the same key while the result is cached.

use crate::catalog::error::CatalogError;
use crate::catalog::ReferenceData;
use crate::weather_data::error::WeatherDataError;
use crate::weather_data::key::WeatherKey;
use polars::prelude::DataFrame;
use std::future::Future;
use std::sync::Arc;

/// Produces the static reference tables.
pub trait ReferenceSource: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<ReferenceData, CatalogError>> + Send;
}

/// Produces the weather table of one department for a year range and completeness threshold.
///
/// The returned frame has one row per (station, date) with the columns listed in
/// [`crate::weather_data::processing`]. A department where no station-year passes the
/// threshold yields an empty frame, not an error.
pub trait WeatherSource: Send + Sync {
    fn load(
        &self,
        key: &WeatherKey,
    ) -> impl Future<Output = Result<DataFrame, WeatherDataError>> + Send;
}

impl<R: ReferenceSource> ReferenceSource for Arc<R> {
    async fn load(&self) -> Result<ReferenceData, CatalogError> {
        self.as_ref().load().await
    }
}

impl<W: WeatherSource> WeatherSource for Arc<W> {
    async fn load(&self, key: &WeatherKey) -> Result<DataFrame, WeatherDataError> {
        self.as_ref().load(key).await
    }
}
