use serde::{Deserialize, Serialize};

/// A city of the reference catalog, linked to its closest good weather station.
///
/// City names are not unique across the catalog (several communes share a name);
/// see [`crate::selection::resolve_city`] for how a name is turned into one row.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Identifier of the closest station that passed the quality filter.
    pub closest_station_id: i64,
    /// Great-circle distance to that station.
    pub distance_km: f64,
}
