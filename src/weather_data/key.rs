use crate::types::department::DepartmentCode;
use ordered_float::OrderedFloat;
use std::fmt;

/// Identifies one memoized weather table.
///
/// The completeness threshold goes through `OrderedFloat` so the key can be hashed; two
/// keys built from the same four values are always equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeatherKey {
    pub department: DepartmentCode,
    pub start_year: i32,
    pub end_year: i32,
    pub completion_threshold: OrderedFloat<f64>,
}

impl WeatherKey {
    pub fn new(
        department: DepartmentCode,
        start_year: i32,
        end_year: i32,
        completion_threshold: f64,
    ) -> Self {
        Self {
            department,
            start_year,
            end_year,
            completion_threshold: OrderedFloat(completion_threshold),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.completion_threshold.into_inner()
    }

    /// Rejects keys no weather table can be built for.
    pub fn validate(&self) -> Result<(), String> {
        check_period(self.start_year, self.end_year, self.threshold())
    }
}

/// Checks a year range and a completion threshold. The message describes the first problem.
pub fn check_period(start_year: i32, end_year: i32, completion_threshold: f64) -> Result<(), String> {
    if start_year > end_year {
        return Err(format!(
            "start year {} is after end year {}",
            start_year, end_year
        ));
    }
    if !(0.0..=1.0).contains(&completion_threshold) {
        return Err(format!(
            "completion rate threshold {} is outside [0, 1]",
            completion_threshold
        ));
    }
    Ok(())
}

impl fmt::Display for WeatherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "department {} {}-{} (completion >= {})",
            self.department, self.start_year, self.end_year, self.completion_threshold
        )
    }
}
