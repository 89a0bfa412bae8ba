//! Defines the data structures representing Météo-France weather stations, together with
//! the implementations needed to index them spatially with the `rstar` crate.

use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// A single Météo-France weather station from the reference catalog.
///
/// Stations are loaded once from the local data directory and are read-only afterwards.
/// Only stations whose [`Station::good`] flag is set survive
/// [`crate::catalog::stations::load_good_stations`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Station {
    /// The station identifier (`NUM_POSTE`), e.g. `74056001`. Its decimal string starts
    /// with the department code; see [`crate::DepartmentCode::from_station_id`].
    pub id: i64,
    /// The usual name of the station (`NOM_USUEL`).
    pub name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Altitude above sea level in meters, if known.
    pub altitude: Option<f64>,
    /// Whether the station passed the upstream quality filter.
    pub good: bool,
}

// --- R-Tree Implementations ---

/// Lets a `Station` live inside an `RTree`, as a degenerate box around its location.
impl RTreeObject for Station {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.latitude, self.longitude])
    }
}

/// Squared Euclidean distance in degree space.
///
/// Only used to order candidates during nearest-neighbour iteration; the final pick is made
/// with the haversine distance in [`crate::catalog::cities::StationLocator`].
impl PointDistance for Station {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.latitude - point[0];
        let dy = self.longitude - point[1];
        dx * dx + dy * dy
    }
}
