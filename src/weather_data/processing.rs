//! Turns the raw department table into the weather table served to callers.
//!
//! Raw columns (as cached in parquet): `station_id` (i64), `station_name` (str),
//! `alti` (f64), `raw_date` (i64, `YYYYMMDD`), `tmin` (f64, nullable).
//!
//! Output columns, one row per (station, date), sorted by station then date:
//! `station_id`, `station_name`, `alti`, `date`, `year`, `month`, `day`, `tmin`,
//! `frost_day`, `completion_rate`.

use crate::weather_data::key::WeatherKey;
use polars::prelude::*;

pub const COL_STATION_ID: &str = "station_id";
pub const COL_STATION_NAME: &str = "station_name";
pub const COL_ALTI: &str = "alti";
pub const COL_RAW_DATE: &str = "raw_date";
pub const COL_DATE: &str = "date";
pub const COL_YEAR: &str = "year";
pub const COL_MONTH: &str = "month";
pub const COL_DAY: &str = "day";
pub const COL_TMIN: &str = "tmin";
pub const COL_FROST_DAY: &str = "frost_day";
pub const COL_COMPLETION_RATE: &str = "completion_rate";

pub trait WeatherFrameExt {
    /// Parses `raw_date` into `date` and derives `year`, `month` and `day` (all Int32).
    fn with_calendar_columns(self) -> LazyFrame;

    /// Keeps rows whose `year` lies in `start_year..=end_year`.
    fn filter_years(self, start_year: i32, end_year: i32) -> LazyFrame;

    /// Adds `completion_rate`: the share of days of the row's station-year that have a
    /// minimum temperature, out of 365 or 366.
    fn with_completion_rate(self) -> LazyFrame;

    /// Keeps rows whose station-year completion rate is at least `threshold`.
    fn filter_completion(self, threshold: f64) -> LazyFrame;

    /// Adds the boolean `frost_day` column: `tmin <= frost_threshold_celsius`.
    fn with_frost_flag(self, frost_threshold_celsius: f64) -> LazyFrame;
}

impl WeatherFrameExt for LazyFrame {
    fn with_calendar_columns(self) -> LazyFrame {
        self.with_column(
            col(COL_RAW_DATE)
                .cast(DataType::String)
                .str()
                .to_date(StrptimeOptions {
                    format: Some("%Y%m%d".into()),
                    ..Default::default()
                })
                .alias(COL_DATE),
        )
        .with_columns([
            col(COL_DATE).dt().year().alias(COL_YEAR),
            col(COL_DATE)
                .dt()
                .month()
                .cast(DataType::Int32)
                .alias(COL_MONTH),
            col(COL_DATE).dt().day().cast(DataType::Int32).alias(COL_DAY),
        ])
    }

    fn filter_years(self, start_year: i32, end_year: i32) -> LazyFrame {
        self.filter(
            col(COL_YEAR)
                .gt_eq(lit(start_year))
                .and(col(COL_YEAR).lt_eq(lit(end_year))),
        )
    }

    fn with_completion_rate(self) -> LazyFrame {
        let observed_days = col(COL_TMIN)
            .is_not_null()
            .cast(DataType::Float64)
            .sum()
            .over([col(COL_STATION_ID), col(COL_YEAR)]);
        let days_in_year = when(col(COL_DATE).dt().is_leap_year())
            .then(lit(366.0))
            .otherwise(lit(365.0));
        self.with_column((observed_days / days_in_year).alias(COL_COMPLETION_RATE))
    }

    fn filter_completion(self, threshold: f64) -> LazyFrame {
        self.filter(col(COL_COMPLETION_RATE).gt_eq(lit(threshold)))
    }

    fn with_frost_flag(self, frost_threshold_celsius: f64) -> LazyFrame {
        self.with_column(
            col(COL_TMIN)
                .lt_eq(lit(frost_threshold_celsius))
                .alias(COL_FROST_DAY),
        )
    }
}

/// Full pipeline from the raw department table to the weather table for `key`.
///
/// Completion rates are computed before rows without a minimum temperature are dropped,
/// so missing days still count against their station-year.
pub fn prepare_weather_frame(
    raw: LazyFrame,
    key: &WeatherKey,
    frost_threshold_celsius: f64,
) -> LazyFrame {
    raw.with_calendar_columns()
        .filter_years(key.start_year, key.end_year)
        .with_completion_rate()
        .filter_completion(key.threshold())
        .filter(col(COL_TMIN).is_not_null())
        .with_frost_flag(frost_threshold_celsius)
        .select([
            col(COL_STATION_ID),
            col(COL_STATION_NAME),
            col(COL_ALTI),
            col(COL_DATE),
            col(COL_YEAR),
            col(COL_MONTH),
            col(COL_DAY),
            col(COL_TMIN),
            col(COL_FROST_DAY),
            col(COL_COMPLETION_RATE),
        ])
        .sort([COL_STATION_ID, COL_DATE], SortMultipleOptions::default())
}
