use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A property listing as returned by the search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub listing_type: Option<ListingType>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    /// Floor area in square metres
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub listed_at: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Listing {
    /// Short price label, e.g. "USD 250,000"
    pub fn price_label(&self) -> String {
        let whole = self.price.round() as i64;
        let digits = whole.abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let sign = if whole < 0 { "-" } else { "" };
        format!("{} {}{}", self.currency, sign, grouped)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    #[value(alias = "buy")]
    Sale,
    Rent,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Sale => "sale",
            ListingType::Rent => "rent",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SortOrder {
    Newest,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
        }
    }
}

/// Search criteria chosen by the user
///
/// The page cursor is not part of the filters; the feed controller owns it.
/// `location` comes from the surrounding route rather than the filter form
/// and is tracked separately from the fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub listing_type: Option<ListingType>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub min_area: Option<f64>,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
    #[serde(default)]
    pub location: Option<String>,
}

impl SearchFilters {
    /// Query parameters for the search endpoint, excluding pagination
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(keyword) = self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            pairs.push(("q", keyword.to_string()));
        }
        if let Some(ref property_type) = self.property_type {
            pairs.push(("propertyType", property_type.clone()));
        }
        if let Some(listing_type) = self.listing_type {
            pairs.push(("listingType", listing_type.as_str().to_string()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.to_string()));
        }
        if let Some(bedrooms) = self.bedrooms {
            pairs.push(("bedrooms", bedrooms.to_string()));
        }
        if let Some(bathrooms) = self.bathrooms {
            pairs.push(("bathrooms", bathrooms.to_string()));
        }
        if let Some(area) = self.min_area {
            pairs.push(("minArea", area.to_string()));
        }
        if !self.amenities.is_empty() {
            let joined = self.amenities.iter().cloned().collect::<Vec<_>>().join(",");
            pairs.push(("amenities", joined));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.as_str().to_string()));
        }
        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            pairs.push(("location", location.to_string()));
        }
        pairs
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<Listing>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl SearchPage {
    /// An empty first page, used when a failed search degrades to "no results"
    pub fn empty(limit: u32) -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            limit,
            total: 0,
            total_pages: 0,
        }
    }

    /// Check the response against the request that produced it
    pub fn validate(&self, requested_page: u32, requested_limit: u32) -> crate::Result<()> {
        if self.page != requested_page {
            return Err(crate::Error::Contract(format!(
                "asked for page {} but got page {}",
                requested_page, self.page
            )));
        }
        if self.items.len() as u64 > u64::from(requested_limit.max(self.limit)) {
            return Err(crate::Error::Contract(format!(
                "page holds {} items, limit is {}",
                self.items.len(),
                requested_limit
            )));
        }
        if self.items.len() as u64 > self.total {
            return Err(crate::Error::Contract(format!(
                "page holds {} items but total is {}",
                self.items.len(),
                self.total
            )));
        }
        let limit = u64::from(self.limit.max(1));
        let expected_pages = self.total.div_ceil(limit);
        // Some backends report a single empty page for zero results
        let empty_ok = self.total == 0 && self.total_pages <= 1;
        if !empty_ok && u64::from(self.total_pages) != expected_pages {
            return Err(crate::Error::Contract(format!(
                "total {} at limit {} implies {} pages, response says {}",
                self.total, self.limit, expected_pages, self.total_pages
            )));
        }
        Ok(())
    }
}

/// Vertical scroll geometry reported by the view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Current scroll offset from the top
    pub offset: f64,
    /// Height of the visible viewport
    pub viewport: f64,
    /// Full scrollable content height
    pub content: f64,
}

impl ScrollMetrics {
    /// Remaining distance between the viewport bottom and the content bottom
    pub fn distance_from_bottom(&self) -> f64 {
        (self.content - (self.offset + self.viewport)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str) -> Listing {
        Listing {
            id: id.to_string(),
            title: format!("Listing {}", id),
            price: 250_000.0,
            currency: "USD".to_string(),
            location: None,
            property_type: None,
            listing_type: None,
            bedrooms: None,
            bathrooms: None,
            area: None,
            cover_image: None,
            listed_at: None,
        }
    }

    #[test]
    fn test_deserialize_wire_page() {
        let json = r#"{
            "items": [{"id": "a1", "title": "Loft", "price": 1200, "listingType": "rent",
                       "coverImage": "https://img/a1.jpg"}],
            "page": 1, "limit": 12, "total": 1, "totalPages": 1
        }"#;
        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.items[0].listing_type, Some(ListingType::Rent));
        assert_eq!(page.items[0].currency, "USD");
        assert_eq!(page.items[0].cover_image.as_deref(), Some("https://img/a1.jpg"));
        assert!(page.validate(1, 12).is_ok());
    }

    #[test]
    fn test_validate_catches_inconsistent_pages() {
        let mut page = SearchPage {
            items: vec![listing("1"), listing("2")],
            page: 2,
            limit: 2,
            total: 5,
            total_pages: 3,
        };
        assert!(page.validate(2, 2).is_ok());
        assert!(page.validate(3, 2).is_err());

        page.total_pages = 4;
        assert!(matches!(page.validate(2, 2), Err(crate::Error::Contract(_))));

        page.total_pages = 3;
        page.total = 1;
        assert!(page.validate(2, 2).is_err());
    }

    #[test]
    fn test_query_pairs_skip_blank_keyword() {
        let filters = SearchFilters {
            keyword: Some("   ".to_string()),
            listing_type: Some(ListingType::Sale),
            amenities: ["pool".to_string(), "garage".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let pairs = filters.query_pairs();
        assert!(!pairs.iter().any(|(k, _)| *k == "q"));
        assert!(pairs.contains(&("listingType", "sale".to_string())));
        assert!(pairs.contains(&("amenities", "garage,pool".to_string())));
    }

    #[test]
    fn test_price_label_groups_thousands() {
        assert_eq!(listing("1").price_label(), "USD 250,000");
        let mut cheap = listing("2");
        cheap.price = 950.0;
        assert_eq!(cheap.price_label(), "USD 950");
    }

    #[test]
    fn test_distance_from_bottom() {
        let metrics = ScrollMetrics { offset: 700.0, viewport: 800.0, content: 2000.0 };
        assert_eq!(metrics.distance_from_bottom(), 500.0);
        let overscrolled = ScrollMetrics { offset: 1300.0, viewport: 800.0, content: 2000.0 };
        assert_eq!(overscrolled.distance_from_bottom(), 0.0);
    }
}
