//! French administrative department codes as they appear in station identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The department a weather station belongs to, e.g. `"74"` for Haute-Savoie.
///
/// Météo-France station identifiers start with the department code. The code is derived
/// from the *decimal string of the raw integer* identifier, so identifiers whose leading
/// zero was lost when parsed as a number (e.g. `1014002` for `01014002`) yield the
/// characters that are actually there (`"10"`), never a re-padded code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepartmentCode(String);

impl DepartmentCode {
    /// Takes the first two characters of `station_id.to_string()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use winter_is_coming::DepartmentCode;
    ///
    /// assert_eq!(DepartmentCode::from_station_id(75114001).as_str(), "75");
    /// assert_eq!(DepartmentCode::from_station_id(1234).as_str(), "12");
    /// ```
    pub fn from_station_id(station_id: i64) -> Self {
        let id = station_id.to_string();
        Self(id.chars().take(2).collect())
    }

    /// Wraps an already known code, e.g. one typed by a user.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepartmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_from_station_id_table() {
        let cases: [(i64, &str); 8] = [
            (75114001, "75"), // Paris-Montsouris
            (74056001, "74"), // Chamonix
            (74281001, "74"),
            (1014002, "10"),  // 01014002 read as an integer loses its leading zero
            (1234, "12"),     // legacy 4-digit identifier
            (97415590, "97"), // La Réunion
            (98714001, "98"), // overseas collectivity
            (20004002, "20"), // Corsica keeps its numeric prefix
        ];
        for (station_id, expected) in cases {
            assert_eq!(
                DepartmentCode::from_station_id(station_id).as_str(),
                expected,
                "station {station_id}"
            );
        }
    }

    #[test]
    fn test_department_from_single_digit_id() {
        assert_eq!(DepartmentCode::from_station_id(7).as_str(), "7");
    }

    #[test]
    fn test_department_display() {
        assert_eq!(DepartmentCode::new("2A").to_string(), "2A");
    }
}
