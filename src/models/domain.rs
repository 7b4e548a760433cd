use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One square foot in square meters, exact conversion factor.
pub const SQFT_TO_SQM: f64 = 0.092903;

/// Unit a caller-supplied floor area is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaUnit {
    Sqm,
    Sqft,
}

/// Land tenure of the property being valued
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Tenure {
    Freehold,
    Leasehold { years: u16 },
    Unknown,
}

impl Default for Tenure {
    fn default() -> Self {
        Tenure::Unknown
    }
}

impl Tenure {
    /// Remaining lease in years, treating freehold as a 999-year lease
    /// (the convention the training pipelines used for the lease feature).
    pub fn lease_years(&self) -> f64 {
        match self {
            Tenure::Freehold => 999.0,
            Tenure::Leasehold { years } => f64::from(*years),
            Tenure::Unknown => 99.0,
        }
    }
}

/// Per-request valuation query as supplied by the calling layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyQuery {
    pub address: String,
    #[serde(rename = "propertyType")]
    pub property_type: String,
    /// Floor area in the unit given by `area_unit`.
    pub area: f64,
    #[serde(rename = "areaUnit")]
    pub area_unit: AreaUnit,
    /// Raw floor level descriptor, e.g. "03-05", "Ground", "B1".
    #[serde(rename = "floorLevel", default)]
    pub floor_level: Option<String>,
    /// Unit identifier within the building, e.g. "#12-08".
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub tenure: Tenure,
}

impl PropertyQuery {
    /// Normalize the floor area into both internal units. This is the single
    /// point where unit conversion happens; everything downstream works with
    /// the resolved values.
    pub fn resolve(&self) -> ResolvedQuery {
        let (area_sqm, area_sqft) = match self.area_unit {
            AreaUnit::Sqm => (self.area, self.area / SQFT_TO_SQM),
            AreaUnit::Sqft => (self.area * SQFT_TO_SQM, self.area),
        };
        ResolvedQuery {
            query: self.clone(),
            area_sqm,
            area_sqft,
        }
    }
}

/// A query with its floor area normalized to square meters (with the sqft
/// equivalent kept alongside, since several model conventions price per sqft)
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub query: PropertyQuery,
    pub area_sqm: f64,
    pub area_sqft: f64,
}

/// Parsed floor level descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloorLevel {
    Ground,
    Basement { level: u8 },
    Numbered { low: u16, high: u16 },
}

impl FloorLevel {
    /// Midpoint of the floor range as a signed storey number.
    /// Basements are negative, ground is 1.
    pub fn midpoint(&self) -> f64 {
        match self {
            FloorLevel::Ground => 1.0,
            FloorLevel::Basement { level } => -f64::from(*level),
            FloorLevel::Numbered { low, high } => (f64::from(*low) + f64::from(*high)) / 2.0,
        }
    }

    pub fn low(&self) -> f64 {
        match self {
            FloorLevel::Ground => 1.0,
            FloorLevel::Basement { level } => -f64::from(*level),
            FloorLevel::Numbered { low, .. } => f64::from(*low),
        }
    }

    pub fn high(&self) -> f64 {
        match self {
            FloorLevel::Ground => 1.0,
            FloorLevel::Basement { level } => -f64::from(*level),
            FloorLevel::Numbered { high, .. } => f64::from(*high),
        }
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, FloorLevel::Ground)
    }

    pub fn is_basement(&self) -> bool {
        matches!(self, FloorLevel::Basement { .. })
    }
}

/// Region classification derived from the postal district
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    CentralCore,
    RestCentral,
    CityFringe,
    OutsideCentral,
}

impl Region {
    pub fn label(&self) -> &'static str {
        match self {
            Region::CentralCore => "Central Core",
            Region::RestCentral => "Rest Central",
            Region::CityFringe => "City Fringe",
            Region::OutsideCentral => "Outside Central",
        }
    }
}

/// District-range boundaries mapping postal districts onto regions.
///
/// Different trained models used different band conventions historically, so
/// an artifact may carry its own boundaries overriding the configured ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBands {
    /// Districts 1..=this classify as Central Core.
    #[serde(rename = "centralCoreMax")]
    pub central_core_max: u8,
    #[serde(rename = "restCentralMax")]
    pub rest_central_max: u8,
    #[serde(rename = "cityFringeMax")]
    pub city_fringe_max: u8,
}

impl Default for RegionBands {
    fn default() -> Self {
        Self {
            central_core_max: 9,
            rest_central_max: 16,
            city_fringe_max: 21,
        }
    }
}

impl RegionBands {
    pub fn classify(&self, district: u8) -> Region {
        if district <= self.central_core_max {
            Region::CentralCore
        } else if district <= self.rest_central_max {
            Region::RestCentral
        } else if district <= self.city_fringe_max {
            Region::CityFringe
        } else {
            Region::OutsideCentral
        }
    }
}

/// Geospatial features derived from the query address.
/// Recomputed per query, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeatures {
    pub latitude: f64,
    pub longitude: f64,
    pub postal_district: u8,
    /// Distance in km to the nearest reference transit point.
    pub min_transit_km: f64,
    /// Count of reference transit points within 1 km.
    pub transit_count_1km: u32,
    pub cbd_km: f64,
    pub accessibility_score: f64,
    pub region: Region,
    pub prestige_score: f64,
}

/// Broad model category a query is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCategory {
    Commercial,
    Industrial,
    Rental,
}

/// Historical transaction from the reference corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "propertyType")]
    pub property_type: String,
    #[serde(rename = "postalDistrict")]
    pub postal_district: u8,
    #[serde(rename = "planningArea", default)]
    pub planning_area: Option<String>,
    /// Floor area in square meters.
    #[serde(rename = "areaSqm")]
    pub area_sqm: f64,
    /// Transacted total price.
    pub price: f64,
    /// Precomputed price per square foot, when the source table carries one.
    #[serde(rename = "pricePsf", default)]
    pub price_psf: Option<f64>,
    #[serde(rename = "contractDate")]
    pub contract_date: NaiveDate,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
}

impl TransactionRecord {
    /// Price per square foot, preferring the precomputed column and falling
    /// back to price / area. `None` when neither is computable.
    pub fn psf(&self) -> Option<f64> {
        if let Some(psf) = self.price_psf {
            if psf > 0.0 {
                return Some(psf);
            }
        }
        if self.area_sqm > 0.0 && self.price > 0.0 {
            Some(self.price / (self.area_sqm / SQFT_TO_SQM))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_round_trip() {
        let query = PropertyQuery {
            address: "1 Test Street".to_string(),
            property_type: "Office".to_string(),
            area: 1000.0,
            area_unit: AreaUnit::Sqft,
            floor_level: None,
            unit: None,
            tenure: Tenure::Unknown,
        };

        let resolved = query.resolve();
        assert!((resolved.area_sqm - 92.903).abs() < 1e-9);
        assert!((resolved.area_sqft - 1000.0).abs() < 1e-9);

        // Converting back recovers the original within floating point tolerance
        let back = resolved.area_sqm / SQFT_TO_SQM;
        assert!((back - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_region_bands_default() {
        let bands = RegionBands::default();
        assert_eq!(bands.classify(1), Region::CentralCore);
        assert_eq!(bands.classify(9), Region::CentralCore);
        assert_eq!(bands.classify(10), Region::RestCentral);
        assert_eq!(bands.classify(17), Region::CityFringe);
        assert_eq!(bands.classify(22), Region::OutsideCentral);
        assert_eq!(bands.classify(28), Region::OutsideCentral);
    }

    #[test]
    fn test_floor_level_midpoint() {
        assert_eq!(FloorLevel::Ground.midpoint(), 1.0);
        assert_eq!(FloorLevel::Basement { level: 2 }.midpoint(), -2.0);
        assert_eq!(FloorLevel::Numbered { low: 3, high: 5 }.midpoint(), 4.0);
    }

    #[test]
    fn test_transaction_psf() {
        let record = TransactionRecord {
            property_type: "Office".to_string(),
            postal_district: 1,
            planning_area: None,
            area_sqm: 92.903,
            price: 2_000_000.0,
            price_psf: None,
            contract_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            project: None,
            street: None,
        };

        // 92.903 sqm is 1000 sqft, so PSF is price / 1000
        let psf = record.psf().unwrap();
        assert!((psf - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn test_tenure_lease_years() {
        assert_eq!(Tenure::Freehold.lease_years(), 999.0);
        assert_eq!(Tenure::Leasehold { years: 60 }.lease_years(), 60.0);
    }
}
