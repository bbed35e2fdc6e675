// Filter state for the vehicle listing: parsed from the address bar,
// mirrored back into hrefs, and mapped onto the API's wire parameters.

use std::collections::HashMap;

pub const DEFAULT_PAGE: u32 = 1;

/// Search criteria entered in the filter panel. Absent or empty fields are
/// omitted from every derived query, never sent as empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleFilters {
    pub search: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub city: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_year: Option<u32>,
    pub max_year: Option<u32>,
    pub min_mileage: Option<u64>,
    pub max_mileage: Option<u64>,
    pub page: u32,
}

impl Default for VehicleFilters {
    fn default() -> Self {
        VehicleFilters {
            search: None,
            brand: None,
            model: None,
            city: None,
            fuel_type: None,
            transmission: None,
            min_price: None,
            max_price: None,
            min_year: None,
            max_year: None,
            min_mileage: None,
            max_mileage: None,
            page: DEFAULT_PAGE,
        }
    }
}

impl VehicleFilters {
    /// Parses address-bar query parameters. Unknown keys and malformed
    /// numeric values are dropped silently; empty values count as absent.
    pub fn from_query_map(params: &HashMap<String, String>) -> Self {
        let mut filters = VehicleFilters::default();
        for (key, value) in params {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "search" => filters.search = Some(value.to_owned()),
                "brand" => filters.brand = Some(value.to_owned()),
                "model" => filters.model = Some(value.to_owned()),
                "city" => filters.city = Some(value.to_owned()),
                "fuelType" => filters.fuel_type = Some(value.to_owned()),
                "transmission" => filters.transmission = Some(value.to_owned()),
                "minPrice" => filters.min_price = value.parse().ok(),
                "maxPrice" => filters.max_price = value.parse().ok(),
                "minYear" => filters.min_year = value.parse().ok(),
                "maxYear" => filters.max_year = value.parse().ok(),
                "minMileage" => filters.min_mileage = value.parse().ok(),
                "maxMileage" => filters.max_mileage = value.parse().ok(),
                "page" => {
                    if let Ok(page) = value.parse::<u32>() {
                        if page >= DEFAULT_PAGE {
                            filters.page = page;
                        }
                    }
                }
                _ => {} // not a filter field, ignore
            }
        }
        filters
    }

    /// A filter-panel submission replaces the criteria wholesale and always
    /// lands back on the first page.
    pub fn with_filters(&self, update: VehicleFilters) -> VehicleFilters {
        VehicleFilters {
            page: DEFAULT_PAGE,
            ..update
        }
    }

    /// Changing only the page keeps every filter field untouched.
    pub fn with_page(&self, page: u32) -> VehicleFilters {
        let mut filters = self.clone();
        filters.page = page.max(DEFAULT_PAGE);
        filters
    }

    /// Address-bar form of the criteria (camelCase field names, stable
    /// order). `page` is omitted on the first page so plain filter URLs stay
    /// clean and shareable.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_text(&mut pairs, "search", &self.search);
        push_text(&mut pairs, "brand", &self.brand);
        push_text(&mut pairs, "model", &self.model);
        push_text(&mut pairs, "city", &self.city);
        push_text(&mut pairs, "fuelType", &self.fuel_type);
        push_text(&mut pairs, "transmission", &self.transmission);
        push_number(&mut pairs, "minPrice", self.min_price);
        push_number(&mut pairs, "maxPrice", self.max_price);
        push_number(&mut pairs, "minYear", self.min_year);
        push_number(&mut pairs, "maxYear", self.max_year);
        push_number(&mut pairs, "minMileage", self.min_mileage);
        push_number(&mut pairs, "maxMileage", self.max_mileage);
        if self.page != DEFAULT_PAGE {
            pairs.push(("page", self.page.to_string()));
        }
        pairs
    }

    /// Query-string form of `to_query_pairs`, including the leading '?'.
    /// Empty when no filter is active and the page is the first.
    pub fn to_query_string(&self) -> String {
        let pairs = self.to_query_pairs();
        if pairs.is_empty() {
            return String::new();
        }
        let encoded: Vec<String> = pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();
        format!("?{}", encoded.join("&"))
    }

    /// Wire form sent to the marketplace API (snake_case field names).
    /// `page` is always present here; pagination is explicit on the wire.
    pub fn to_api_params(&self, per_page: u32) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_text(&mut params, "search", &self.search);
        push_text(&mut params, "brand", &self.brand);
        push_text(&mut params, "model", &self.model);
        push_text(&mut params, "city", &self.city);
        push_text(&mut params, "fuel_type", &self.fuel_type);
        push_text(&mut params, "transmission", &self.transmission);
        push_number(&mut params, "min_price", self.min_price);
        push_number(&mut params, "max_price", self.max_price);
        push_number(&mut params, "min_year", self.min_year);
        push_number(&mut params, "max_year", self.max_year);
        push_number(&mut params, "min_mileage", self.min_mileage);
        push_number(&mut params, "max_mileage", self.max_mileage);
        params.push(("page", self.page.to_string()));
        params.push(("per_page", per_page.to_string()));
        params
    }
}

fn push_text(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(value) = value {
        if !value.is_empty() {
            pairs.push((key, value.clone()));
        }
    }
}

fn push_number<N: ToString>(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<N>) {
    if let Some(value) = value {
        pairs.push((key, value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VehicleFilters {
        VehicleFilters {
            search: Some("suv familiar".to_owned()),
            brand: Some("BMW".to_owned()),
            city: Some("Lisboa".to_owned()),
            fuel_type: Some("diesel".to_owned()),
            min_price: Some(20000),
            max_year: Some(2022),
            min_mileage: Some(10000),
            page: 3,
            ..VehicleFilters::default()
        }
    }

    fn as_map(pairs: Vec<(&'static str, String)>) -> HashMap<String, String> {
        pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect()
    }

    #[test]
    fn address_bar_round_trip() {
        let filters = sample();
        let parsed = VehicleFilters::from_query_map(&as_map(filters.to_query_pairs()));
        assert_eq!(parsed, filters);
    }

    #[test]
    fn round_trip_with_no_filters_is_default() {
        let filters = VehicleFilters::default();
        assert!(filters.to_query_pairs().is_empty());
        assert_eq!(filters.to_query_string(), "");
        let parsed = VehicleFilters::from_query_map(&HashMap::new());
        assert_eq!(parsed, filters);
    }

    #[test]
    fn empty_values_are_treated_as_absent() {
        let mut map = HashMap::new();
        map.insert("brand".to_owned(), "".to_owned());
        map.insert("search".to_owned(), "   ".to_owned());
        map.insert("city".to_owned(), "Porto".to_owned());
        let filters = VehicleFilters::from_query_map(&map);
        assert_eq!(filters.brand, None);
        assert_eq!(filters.search, None);
        assert_eq!(filters.city.as_deref(), Some("Porto"));
        // Nothing empty leaks into the wire parameters either
        let params = filters.to_api_params(12);
        assert!(params.iter().all(|(_, value)| !value.is_empty()));
    }

    #[test]
    fn unknown_and_malformed_keys_are_dropped_silently() {
        let mut map = HashMap::new();
        map.insert("minPrice".to_owned(), "abc".to_owned());
        map.insert("utm_source".to_owned(), "newsletter".to_owned());
        map.insert("page".to_owned(), "0".to_owned());
        map.insert("brand".to_owned(), "Audi".to_owned());
        let filters = VehicleFilters::from_query_map(&map);
        assert_eq!(filters.min_price, None);
        assert_eq!(filters.page, DEFAULT_PAGE);
        assert_eq!(filters.brand.as_deref(), Some("Audi"));
    }

    #[test]
    fn changing_filters_resets_page() {
        let current = sample();
        let mut update = sample();
        update.max_price = Some(45000);
        let next = current.with_filters(update);
        assert_eq!(next.page, DEFAULT_PAGE);
        assert_eq!(next.max_price, Some(45000));
    }

    #[test]
    fn changing_page_keeps_filters() {
        let current = sample();
        let next = current.with_page(5);
        assert_eq!(next.page, 5);
        assert_eq!(next.brand, current.brand);
        assert_eq!(next.min_price, current.min_price);
        assert_eq!(next.search, current.search);
    }

    #[test]
    fn wire_params_use_snake_case_names() {
        let filters = VehicleFilters {
            brand: Some("BMW".to_owned()),
            min_price: Some(20000),
            ..VehicleFilters::default()
        };
        let params = filters.to_api_params(12);
        assert!(params.contains(&("brand", "BMW".to_owned())));
        assert!(params.contains(&("min_price", "20000".to_owned())));
        assert!(params.contains(&("page", "1".to_owned())));
        assert!(!params.iter().any(|(key, _)| *key == "minPrice"));
    }

    #[test]
    fn query_string_is_percent_encoded() {
        let filters = VehicleFilters {
            search: Some("coupé desportivo".to_owned()),
            ..VehicleFilters::default()
        };
        assert_eq!(
            filters.to_query_string(),
            "?search=coup%C3%A9%20desportivo"
        );
    }
}
