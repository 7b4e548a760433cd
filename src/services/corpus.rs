use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::core::features::normalize_property_type;
use crate::models::{FloorLevel, TransactionRecord};

/// Errors that can occur while materializing reference data
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only corpus of historical transactions.
///
/// Loaded once at process start (or handed over by the caller as an
/// already-materialized table) and shared across all concurrent queries.
#[derive(Debug, Clone, Default)]
pub struct TransactionCorpus {
    records: Vec<TransactionRecord>,
}

impl TransactionCorpus {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    /// Load the corpus from a JSON array file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<TransactionRecord> = serde_json::from_str(&raw)?;
        info!(rows = records.len(), "transaction corpus loaded");
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn by_district_and_type(
        &self,
        postal_district: u8,
        property_type: &str,
    ) -> Vec<&TransactionRecord> {
        let wanted = normalize_property_type(property_type);
        self.records
            .iter()
            .filter(|r| r.postal_district == postal_district && type_matches(&r.property_type, &wanted))
            .collect()
    }

    pub fn by_district(&self, postal_district: u8) -> Vec<&TransactionRecord> {
        self.records
            .iter()
            .filter(|r| r.postal_district == postal_district)
            .collect()
    }

    pub fn by_type(&self, property_type: &str) -> Vec<&TransactionRecord> {
        let wanted = normalize_property_type(property_type);
        self.records
            .iter()
            .filter(|r| type_matches(&r.property_type, &wanted))
            .collect()
    }

    pub fn by_planning_area(&self, planning_area: &str) -> Vec<&TransactionRecord> {
        self.records
            .iter()
            .filter(|r| {
                r.planning_area
                    .as_deref()
                    .is_some_and(|area| area.eq_ignore_ascii_case(planning_area))
            })
            .collect()
    }
}

fn type_matches(recorded: &str, wanted: &str) -> bool {
    recorded.eq_ignore_ascii_case(wanted)
        || normalize_property_type(recorded).eq_ignore_ascii_case(wanted)
}

/// Floor-level band used as a rental reference table key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloorBand {
    Low,
    Mid,
    High,
}

impl FloorBand {
    pub fn from_level(level: &FloorLevel) -> Self {
        let mid = level.midpoint();
        if mid <= 5.0 {
            FloorBand::Low
        } else if mid <= 15.0 {
            FloorBand::Mid
        } else {
            FloorBand::High
        }
    }
}

/// Floor-area band used as a rental reference table key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaBand {
    UpTo100Sqm,
    UpTo250Sqm,
    UpTo500Sqm,
    Above500Sqm,
}

impl AreaBand {
    pub fn from_sqm(area_sqm: f64) -> Self {
        if area_sqm <= 100.0 {
            AreaBand::UpTo100Sqm
        } else if area_sqm <= 250.0 {
            AreaBand::UpTo250Sqm
        } else if area_sqm <= 500.0 {
            AreaBand::UpTo500Sqm
        } else {
            AreaBand::Above500Sqm
        }
    }
}

/// One row of the market rental-rate reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRateRow {
    /// "Retail" or "Office"; the table covers no other categories.
    #[serde(rename = "propertyType")]
    pub property_type: String,
    #[serde(rename = "postalDistrict")]
    pub postal_district: u8,
    #[serde(rename = "floorBand")]
    pub floor_band: FloorBand,
    #[serde(rename = "areaBand")]
    pub area_band: AreaBand,
    /// Reference period, e.g. "2025Q3".
    pub period: String,
    /// Median rent in dollars per square meter per month.
    #[serde(rename = "medianPsmMonth")]
    pub median_psm_month: f64,
}

/// Market rental rates for retail and office space, keyed by district,
/// floor band, area band and reference period
#[derive(Debug, Clone, Default)]
pub struct RentalRateTable {
    rows: Vec<RentalRateRow>,
}

impl RentalRateTable {
    pub fn new(rows: Vec<RentalRateRow>) -> Self {
        Self { rows }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let rows: Vec<RentalRateRow> = serde_json::from_str(&raw)?;
        info!(rows = rows.len(), "rental rate table loaded");
        Ok(Self { rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Median PSM/month for the key, taking the latest period when none is
    /// requested. Periods sort lexicographically ("2024Q4" < "2025Q1").
    pub fn lookup(
        &self,
        property_type: &str,
        postal_district: u8,
        floor_band: FloorBand,
        area_band: AreaBand,
        period: Option<&str>,
    ) -> Option<f64> {
        let wanted = normalize_property_type(property_type);
        self.rows
            .iter()
            .filter(|row| {
                row.property_type.eq_ignore_ascii_case(&wanted)
                    && row.postal_district == postal_district
                    && row.floor_band == floor_band
                    && row.area_band == area_band
                    && period.map_or(true, |p| row.period == p)
            })
            .max_by(|a, b| a.period.cmp(&b.period))
            .map(|row| row.median_psm_month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(property_type: &str, district: u8, planning_area: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            property_type: property_type.to_string(),
            postal_district: district,
            planning_area: planning_area.map(str::to_string),
            area_sqm: 100.0,
            price: 1_000_000.0,
            price_psf: None,
            contract_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            project: None,
            street: None,
        }
    }

    #[test]
    fn test_filters() {
        let corpus = TransactionCorpus::new(vec![
            record("Office", 1, Some("Downtown Core")),
            record("Retail", 1, Some("Downtown Core")),
            record("Warehouse", 22, Some("Jurong East")),
        ]);

        assert_eq!(corpus.by_district_and_type(1, "Office").len(), 1);
        assert_eq!(corpus.by_district(1).len(), 2);
        assert_eq!(corpus.by_type("warehouse").len(), 1);
        assert_eq!(corpus.by_planning_area("downtown core").len(), 2);
    }

    #[test]
    fn test_type_matching_normalizes() {
        let corpus = TransactionCorpus::new(vec![record("Logistics Hub", 22, None)]);
        // "Logistics Hub" normalizes to Warehouse, as does the query
        assert_eq!(corpus.by_type("Warehouse").len(), 1);
    }

    #[test]
    fn test_floor_band() {
        assert_eq!(FloorBand::from_level(&FloorLevel::Ground), FloorBand::Low);
        assert_eq!(
            FloorBand::from_level(&FloorLevel::Numbered { low: 6, high: 10 }),
            FloorBand::Mid
        );
        assert_eq!(
            FloorBand::from_level(&FloorLevel::Numbered { low: 20, high: 22 }),
            FloorBand::High
        );
    }

    #[test]
    fn test_area_band() {
        assert_eq!(AreaBand::from_sqm(80.0), AreaBand::UpTo100Sqm);
        assert_eq!(AreaBand::from_sqm(400.0), AreaBand::UpTo500Sqm);
        assert_eq!(AreaBand::from_sqm(900.0), AreaBand::Above500Sqm);
    }

    #[test]
    fn test_rental_lookup_latest_period() {
        let table = RentalRateTable::new(vec![
            RentalRateRow {
                property_type: "Office".to_string(),
                postal_district: 1,
                floor_band: FloorBand::Mid,
                area_band: AreaBand::UpTo250Sqm,
                period: "2024Q4".to_string(),
                median_psm_month: 90.0,
            },
            RentalRateRow {
                property_type: "Office".to_string(),
                postal_district: 1,
                floor_band: FloorBand::Mid,
                area_band: AreaBand::UpTo250Sqm,
                period: "2025Q2".to_string(),
                median_psm_month: 95.0,
            },
        ]);

        let latest = table.lookup("Office", 1, FloorBand::Mid, AreaBand::UpTo250Sqm, None);
        assert_eq!(latest, Some(95.0));

        let pinned = table.lookup(
            "Office",
            1,
            FloorBand::Mid,
            AreaBand::UpTo250Sqm,
            Some("2024Q4"),
        );
        assert_eq!(pinned, Some(90.0));

        let missing = table.lookup("Office", 9, FloorBand::Mid, AreaBand::UpTo250Sqm, None);
        assert_eq!(missing, None);
    }
}
