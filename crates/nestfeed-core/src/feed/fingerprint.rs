//! Comparable digest of the filter fields that change a search

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::models::{ListingType, SearchFilters, SortOrder};

/// Opaque, value-comparable form of a filter set
///
/// Two filter sets with the same meaningful values produce equal
/// fingerprints regardless of whitespace, keyword case, or amenity order.
/// The location context is left out; the controller compares it on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct Canonical<'a> {
    keyword: Option<String>,
    property_type: Option<String>,
    listing_type: Option<ListingType>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    bedrooms: Option<u32>,
    bathrooms: Option<u32>,
    min_area: Option<f64>,
    amenities: BTreeSet<String>,
    sort: Option<&'a SortOrder>,
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

impl From<&SearchFilters> for Fingerprint {
    fn from(filters: &SearchFilters) -> Self {
        let canonical = Canonical {
            keyword: normalize(filters.keyword.as_deref()),
            property_type: normalize(filters.property_type.as_deref()),
            listing_type: filters.listing_type,
            min_price: filters.min_price,
            max_price: filters.max_price,
            bedrooms: filters.bedrooms,
            bathrooms: filters.bathrooms,
            min_area: filters.min_area,
            amenities: filters
                .amenities
                .iter()
                .filter_map(|a| normalize(Some(a)))
                .collect(),
            sort: filters.sort.as_ref(),
        };
        // Serializing plain options, numbers and strings cannot fail
        let text = serde_json::to_string(&canonical).unwrap_or_default();
        Fingerprint(text)
    }
}

/// Normalized location context, compared alongside the fingerprint
pub fn location_key(filters: &SearchFilters) -> Option<String> {
    normalize(filters.location.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_values_give_equal_fingerprints() {
        let a = SearchFilters {
            keyword: Some("  Sea View ".to_string()),
            amenities: ["Pool".to_string(), "garage".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let b = SearchFilters {
            keyword: Some("sea view".to_string()),
            amenities: ["garage".to_string(), "pool".to_string()].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(Fingerprint::from(&a), Fingerprint::from(&b));
    }

    #[test]
    fn test_meaningful_change_alters_fingerprint() {
        let base = SearchFilters::default();
        let changed = SearchFilters {
            min_price: Some(100_000.0),
            ..Default::default()
        };
        assert_ne!(Fingerprint::from(&base), Fingerprint::from(&changed));
    }

    #[test]
    fn test_location_excluded_from_fingerprint() {
        let here = SearchFilters {
            location: Some("lisbon".to_string()),
            ..Default::default()
        };
        let there = SearchFilters {
            location: Some("porto".to_string()),
            ..Default::default()
        };
        assert_eq!(Fingerprint::from(&here), Fingerprint::from(&there));
        assert_ne!(location_key(&here), location_key(&there));
    }

    #[test]
    fn test_blank_keyword_equals_missing() {
        let blank = SearchFilters {
            keyword: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(Fingerprint::from(&blank), Fingerprint::from(&SearchFilters::default()));
    }
}
