//! City search and resolution over the linked city table.

use crate::types::city::City;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No city matches '{query}'")]
    NoCityMatch { query: String },
}

/// Names of the cities containing `text`, ignoring case.
///
/// Each name appears once, in the order of its first row. Blank input matches nothing.
///
/// # Examples
///
/// ```
/// use winter_is_coming::{search_cities, City};
///
/// let city = |name: &str| City {
///     name: name.to_string(),
///     latitude: 45.9,
///     longitude: 6.9,
///     closest_station_id: 74056001,
///     distance_km: 1.2,
/// };
/// let cities = vec![city("Chamonix-Mont-Blanc"), city("Chamonix-Mont-Blanc"), city("Annecy")];
/// assert_eq!(search_cities(&cities, "chamonix"), vec!["Chamonix-Mont-Blanc"]);
/// assert!(search_cities(&cities, "  ").is_empty());
/// ```
pub fn search_cities(cities: &[City], text: &str) -> Vec<String> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut names: Vec<String> = Vec::new();
    for city in cities {
        if city.name.to_lowercase().contains(&needle) && !names.contains(&city.name) {
            names.push(city.name.clone());
        }
    }
    names
}

/// Same as [`search_cities`] but reports an empty result as [`SelectionError::NoCityMatch`].
pub fn search_cities_or_fail(cities: &[City], text: &str) -> Result<Vec<String>, SelectionError> {
    let names = search_cities(cities, text);
    if names.is_empty() {
        return Err(SelectionError::NoCityMatch {
            query: text.to_string(),
        });
    }
    Ok(names)
}

/// The first city row named exactly `name`.
pub fn resolve_city<'a>(cities: &'a [City], name: &str) -> Option<&'a City> {
    cities.iter().find(|city| city.name == name)
}

/// Every city row named exactly `name`, in table order.
pub fn cities_named<'a>(cities: &'a [City], name: &'a str) -> impl Iterator<Item = &'a City> {
    cities.iter().filter(move |city| city.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(name: &str, closest_station_id: i64) -> City {
        City {
            name: name.to_string(),
            latitude: 45.0,
            longitude: 6.0,
            closest_station_id,
            distance_km: 0.5,
        }
    }

    fn cities() -> Vec<City> {
        vec![
            city("Saint-Martin", 73001001),
            city("Chamonix-Mont-Blanc", 74056001),
            city("Martigues", 13056001),
            city("Saint-Martin", 66001001),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive() {
        assert_eq!(search_cities(&cities(), "CHAMONIX"), vec!["Chamonix-Mont-Blanc"]);
        assert_eq!(search_cities(&cities(), "mont-b"), vec!["Chamonix-Mont-Blanc"]);
    }

    #[test]
    fn test_search_collapses_names_in_first_appearance_order() {
        assert_eq!(
            search_cities(&cities(), "mart"),
            vec!["Saint-Martin", "Martigues"]
        );
    }

    #[test]
    fn test_search_is_literal() {
        assert!(search_cities(&cities(), "Saint.*").is_empty());
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        assert!(search_cities(&cities(), "").is_empty());
        assert!(search_cities(&cities(), "   ").is_empty());
    }

    #[test]
    fn test_no_match_is_an_error() {
        assert_eq!(
            search_cities_or_fail(&cities(), "Gotham"),
            Err(SelectionError::NoCityMatch {
                query: "Gotham".to_string()
            })
        );
        assert!(search_cities_or_fail(&cities(), "cham").is_ok());
    }

    #[test]
    fn test_first_row_wins_on_duplicate_names() {
        let cities = cities();
        let resolved = resolve_city(&cities, "Saint-Martin").map(|c| c.closest_station_id);
        assert_eq!(resolved, Some(73001001));
        assert_eq!(cities_named(&cities, "Saint-Martin").count(), 2);
        assert!(resolve_city(&cities, "saint-martin").is_none());
    }
}
