use crate::stats::error::StatisticsError;
use crate::weather_data::processing::{
    COL_ALTI, COL_DAY, COL_FROST_DAY, COL_MONTH, COL_STATION_ID, COL_STATION_NAME, COL_YEAR,
};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;

// Leap year used to place (month, day) pairs on a calendar, so February 29th exists.
const CALENDAR_YEAR: i32 = 2000;

/// Number of frost days observed for a station in one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearlyFrostCount {
    pub year: i32,
    pub frost_days: u32,
}

/// Share of observed years in which a calendar day was a frost day, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyFrostProbability {
    pub month: i32,
    pub day: i32,
    pub probability: f64,
}

impl DailyFrostProbability {
    /// The calendar day as a date in a leap year, for formatting.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            CALENDAR_YEAR,
            u32::try_from(self.month).ok()?,
            u32::try_from(self.day).ok()?,
        )
    }
}

/// The weather rows of one station, guaranteed non-empty.
///
/// Built from a department table with [`StationFrame::from_table`]. All statistics only
/// read the `year`, `month`, `day`, `frost_day` and `alti` columns.
///
/// # Examples
///
/// ```
/// use polars::prelude::*;
/// use winter_is_coming::StationFrame;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let table = df!(
///     "station_id" => [74056001i64, 74056001, 74056001],
///     "station_name" => ["CHAMONIX", "CHAMONIX", "CHAMONIX"],
///     "alti" => [1042.0, 1042.0, 1042.0],
///     "year" => [2000i32, 2000, 2001],
///     "month" => [1i32, 1, 1],
///     "day" => [1i32, 2, 1],
///     "frost_day" => [true, true, false]
/// )?;
/// let station = StationFrame::from_table(&table, 74056001)?;
/// assert_eq!(station.mean_frost_days()?, 1.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StationFrame {
    station_id: i64,
    frame: DataFrame,
}

impl StationFrame {
    /// Keeps the rows of `table` belonging to `station_id`.
    ///
    /// Returns [`StatisticsError::StationDataMissing`] when the station has no rows, which
    /// happens when none of its years passed the completeness filter.
    pub fn from_table(table: &DataFrame, station_id: i64) -> Result<Self, StatisticsError> {
        let frame = table
            .clone()
            .lazy()
            .filter(col(COL_STATION_ID).eq(lit(station_id)))
            .collect()?;
        if frame.height() == 0 {
            return Err(StatisticsError::StationDataMissing { station_id });
        }
        Ok(Self { station_id, frame })
    }

    pub fn station_id(&self) -> i64 {
        self.station_id
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Altitude of the station as recorded in its first row.
    pub fn altitude(&self) -> Result<Option<f64>, StatisticsError> {
        Ok(self.frame.column(COL_ALTI)?.f64()?.get(0))
    }

    pub fn station_name(&self) -> Result<Option<String>, StatisticsError> {
        Ok(self
            .frame
            .column(COL_STATION_NAME)?
            .str()?
            .get(0)
            .map(str::to_string))
    }

    /// Frost days per year, ascending by year.
    pub fn frost_days_per_year(&self) -> Result<Vec<YearlyFrostCount>, StatisticsError> {
        let per_year = self
            .frame
            .clone()
            .lazy()
            .group_by([col(COL_YEAR)])
            .agg([col(COL_FROST_DAY)
                .cast(DataType::UInt32)
                .sum()
                .cast(DataType::UInt32)])
            .sort([COL_YEAR], SortMultipleOptions::default())
            .collect()?;

        let years = per_year.column(COL_YEAR)?.i32()?;
        let counts = per_year.column(COL_FROST_DAY)?.u32()?;
        Ok(years
            .into_iter()
            .zip(counts)
            .filter_map(|(year, frost_days)| {
                Some(YearlyFrostCount {
                    year: year?,
                    frost_days: frost_days.unwrap_or(0),
                })
            })
            .collect())
    }

    /// Mean of the yearly frost-day counts over the distinct years present.
    pub fn mean_frost_days(&self) -> Result<f64, StatisticsError> {
        let per_year = self.frost_days_per_year()?;
        if per_year.is_empty() {
            return Err(StatisticsError::StationDataMissing {
                station_id: self.station_id,
            });
        }
        let total: u64 = per_year.iter().map(|y| u64::from(y.frost_days)).sum();
        Ok(total as f64 / per_year.len() as f64)
    }

    /// For each calendar day, the share of observed years in which it was a frost day.
    /// Ordered by month then day.
    pub fn frost_probability_per_day(
        &self,
    ) -> Result<Vec<DailyFrostProbability>, StatisticsError> {
        let per_day = self
            .frame
            .clone()
            .lazy()
            .group_by([col(COL_MONTH), col(COL_DAY)])
            .agg([col(COL_FROST_DAY).cast(DataType::Float64).mean()])
            .sort([COL_MONTH, COL_DAY], SortMultipleOptions::default())
            .collect()?;

        let months = per_day.column(COL_MONTH)?.i32()?;
        let days = per_day.column(COL_DAY)?.i32()?;
        let probabilities = per_day.column(COL_FROST_DAY)?.f64()?;
        Ok(months
            .into_iter()
            .zip(days)
            .zip(probabilities)
            .filter_map(|((month, day), probability)| {
                Some(DailyFrostProbability {
                    month: month?,
                    day: day?,
                    probability: probability?,
                })
            })
            .collect())
    }

    /// The first `rows` rows, for display.
    pub fn preview(&self, rows: usize) -> DataFrame {
        self.frame.head(Some(rows))
    }
}
