use chrono::{Datelike, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::{FloorLevel, GeoFeatures, ModelArtifact, ResolvedQuery};

/// Canonical property type labels used at training time
const CANONICAL_TYPES: [&str; 8] = [
    "Office",
    "Retail",
    "Shop House",
    "Medical Suite",
    "Single-User Factory",
    "Multiple-User Factory",
    "Warehouse",
    "Business Park",
];

/// Normalize a free-form property type to the exact label used in training.
///
/// Falls back to the trimmed input when nothing matches, so an unseen label
/// still flows through as its own category.
pub fn normalize_property_type(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();

    for canonical in CANONICAL_TYPES {
        if canonical.to_lowercase() == lowered {
            return canonical.to_string();
        }
    }

    if lowered.contains("warehouse") || lowered.contains("storage") || lowered.contains("logistics")
    {
        "Warehouse".to_string()
    } else if lowered.contains("factory") || lowered.contains("workshop") {
        if lowered.contains("multiple") || lowered.contains("multi") {
            "Multiple-User Factory".to_string()
        } else {
            "Single-User Factory".to_string()
        }
    } else if lowered.contains("business park") || lowered.contains("hi-tech") {
        "Business Park".to_string()
    } else if lowered.contains("shop house") || lowered.contains("shophouse") {
        "Shop House".to_string()
    } else if lowered.contains("retail") || lowered.contains("shop") || lowered.contains("f&b") {
        "Retail".to_string()
    } else if lowered.contains("medical") || lowered.contains("clinic") {
        "Medical Suite".to_string()
    } else if lowered.contains("office") {
        "Office".to_string()
    } else {
        raw.trim().to_string()
    }
}

/// Parse a raw floor level descriptor into its tagged form.
///
/// Handles "Ground", "G", "B1"/"Basement 2", single storeys ("12"), ranges
/// ("03-05", "06 to 10") and unit-style prefixes ("#12"). Anything
/// unrecognizable degrades to ground level.
pub fn parse_floor_level(raw: Option<&str>) -> FloorLevel {
    let Some(raw) = raw else {
        return FloorLevel::Ground;
    };
    let cleaned = raw.trim().trim_start_matches('#').to_lowercase();
    if cleaned.is_empty() {
        return FloorLevel::Ground;
    }

    if cleaned == "g" || cleaned.starts_with("ground") {
        return FloorLevel::Ground;
    }

    if let Some(rest) = cleaned
        .strip_prefix("basement")
        .or_else(|| cleaned.strip_prefix('b'))
    {
        let level = rest.trim().parse::<u8>().unwrap_or(1);
        return FloorLevel::Basement {
            level: level.max(1),
        };
    }

    let separator = if cleaned.contains(" to ") {
        Some(" to ")
    } else if cleaned.contains('-') {
        Some("-")
    } else {
        None
    };

    if let Some(sep) = separator {
        let mut parts = cleaned.splitn(2, sep);
        let low = parts.next().and_then(|p| p.trim().parse::<u16>().ok());
        let high = parts.next().and_then(|p| p.trim().parse::<u16>().ok());
        if let (Some(low), Some(high)) = (low, high) {
            let (low, high) = if low <= high { (low, high) } else { (high, low) };
            return FloorLevel::Numbered { low, high };
        }
    }

    if let Ok(level) = cleaned.parse::<u16>() {
        if level == 0 {
            return FloorLevel::Ground;
        }
        return FloorLevel::Numbered {
            low: level,
            high: level,
        };
    }

    debug!(raw, "unparseable floor level, defaulting to ground");
    FloorLevel::Ground
}

/// Raw feature value before schema alignment
#[derive(Debug, Clone, PartialEq)]
enum FeatureValue {
    Num(f64),
    Cat(String),
}

/// Build the exact feature vector a model artifact expects.
///
/// Populates the known fields, answers dummy-encoded categorical columns
/// against the artifact's recorded categories, infers neutral defaults for
/// schema columns this query cannot supply, applies the stored imputer and
/// orders everything to the artifact's column order. Never errors; missing
/// information degrades to defaults.
pub fn build_feature_vector(
    resolved: &ResolvedQuery,
    geo: &GeoFeatures,
    artifact: &ModelArtifact,
) -> Vec<f64> {
    let query = &resolved.query;
    let floor = parse_floor_level(query.floor_level.as_deref());
    let property_type = normalize_property_type(&query.property_type);

    let mut raw: HashMap<&str, FeatureValue> = HashMap::new();
    raw.insert("property_type", FeatureValue::Cat(property_type));
    raw.insert("area_sqm", FeatureValue::Num(resolved.area_sqm));
    raw.insert("area_sqft", FeatureValue::Num(resolved.area_sqft));
    raw.insert("floor_area_sqm", FeatureValue::Num(resolved.area_sqm));
    raw.insert("floor_area_sqft", FeatureValue::Num(resolved.area_sqft));
    raw.insert("floor_low", FeatureValue::Num(floor.low()));
    raw.insert("floor_high", FeatureValue::Num(floor.high()));
    raw.insert("floor_mid", FeatureValue::Num(floor.midpoint()));
    raw.insert(
        "is_ground",
        FeatureValue::Num(f64::from(u8::from(floor.is_ground()))),
    );
    raw.insert(
        "is_basement",
        FeatureValue::Num(f64::from(u8::from(floor.is_basement()))),
    );
    raw.insert(
        "tenure",
        FeatureValue::Cat(
            match query.tenure {
                crate::models::Tenure::Freehold => "Freehold",
                crate::models::Tenure::Leasehold { .. } => "Leasehold",
                crate::models::Tenure::Unknown => "Unknown",
            }
            .to_string(),
        ),
    );
    raw.insert("lease_years", FeatureValue::Num(query.tenure.lease_years()));
    raw.insert(
        "postal_district",
        FeatureValue::Num(f64::from(geo.postal_district)),
    );
    raw.insert("latitude", FeatureValue::Num(geo.latitude));
    raw.insert("longitude", FeatureValue::Num(geo.longitude));
    raw.insert("mrt_distance_km", FeatureValue::Num(geo.min_transit_km));
    raw.insert(
        "mrt_count_1km",
        FeatureValue::Num(f64::from(geo.transit_count_1km)),
    );
    raw.insert("cbd_distance_km", FeatureValue::Num(geo.cbd_km));
    raw.insert(
        "accessibility_score",
        FeatureValue::Num(geo.accessibility_score),
    );
    raw.insert("prestige_score", FeatureValue::Num(geo.prestige_score));
    raw.insert("region", FeatureValue::Cat(geo.region.label().to_string()));

    let mut vector = Vec::with_capacity(artifact.expected_feature_names.len());
    for name in &artifact.expected_feature_names {
        let value = resolve_column(name, &raw, artifact);
        vector.push(value);
    }
    vector
}

/// Resolve one schema column against the populated raw values, a dummy
/// encoding, or an inferred default.
fn resolve_column(name: &str, raw: &HashMap<&str, FeatureValue>, artifact: &ModelArtifact) -> f64 {
    if let Some(FeatureValue::Num(v)) = raw.get(name) {
        return *v;
    }

    // Drop-first dummy columns are named "{column}_{category}"; answer them
    // against the populated categorical value.
    for cat_col in &artifact.categorical_columns {
        let prefix = format!("{}_", cat_col.name);
        if let Some(category) = name.strip_prefix(prefix.as_str()) {
            return match raw.get(cat_col.name.as_str()) {
                Some(FeatureValue::Cat(v)) => f64::from(u8::from(v == category)),
                _ => {
                    warn!(column = name, "categorical source missing, encoding as 0");
                    0.0
                }
            };
        }
    }

    // Schema column the query cannot supply: infer a neutral default from
    // the column name, then the imputer, then zero.
    let inferred = infer_default(name, raw);
    if let Some(v) = inferred {
        return v;
    }

    if let Some(imputer) = &artifact.imputer {
        if let Some(v) = imputer.fill_values.get(name) {
            return *v;
        }
    }

    warn!(column = name, "schema column unresolved, filling with 0");
    0.0
}

fn infer_default(name: &str, raw: &HashMap<&str, FeatureValue>) -> Option<f64> {
    let lowered = name.to_lowercase();
    let now = Utc::now();

    if lowered.contains("sqft") {
        if let Some(FeatureValue::Num(v)) = raw.get("area_sqft") {
            return Some(*v);
        }
    }
    if lowered.contains("sqm") || lowered.contains("area") {
        if let Some(FeatureValue::Num(v)) = raw.get("area_sqm") {
            return Some(*v);
        }
    }
    if lowered.contains("year") {
        return Some(f64::from(now.year()));
    }
    if lowered.contains("month") {
        return Some(f64::from(now.month()));
    }
    if lowered.starts_with("is_") || lowered.starts_with("has_") {
        return Some(0.0);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AreaUnit, CategoricalColumn, LinearModel, ModelArtifact, ModelArtifactFormat,
        PropertyQuery, Region, Tenure,
    };

    fn create_test_query(floor: Option<&str>) -> ResolvedQuery {
        PropertyQuery {
            address: "1 Test 018956".to_string(),
            property_type: "office".to_string(),
            area: 1000.0,
            area_unit: AreaUnit::Sqft,
            floor_level: floor.map(str::to_string),
            unit: None,
            tenure: Tenure::Leasehold { years: 99 },
        }
        .resolve()
    }

    fn create_test_geo() -> GeoFeatures {
        GeoFeatures {
            latitude: 1.2839,
            longitude: 103.8510,
            postal_district: 1,
            min_transit_km: 0.05,
            transit_count_1km: 2,
            cbd_km: 0.1,
            accessibility_score: 7.6,
            region: Region::CentralCore,
            prestige_score: 1.0,
        }
    }

    fn create_test_artifact(names: Vec<&str>) -> ModelArtifact {
        ModelArtifact {
            format: ModelArtifactFormat::Combined {
                model: LinearModel {
                    coefficients: vec![0.0; names.len()],
                    intercept: 0.0,
                },
            },
            expected_feature_names: names.into_iter().map(str::to_string).collect(),
            categorical_columns: vec![
                CategoricalColumn {
                    name: "property_type".to_string(),
                    categories: vec![
                        "Office".to_string(),
                        "Retail".to_string(),
                        "Warehouse".to_string(),
                    ],
                },
                CategoricalColumn {
                    name: "region".to_string(),
                    categories: vec!["Central Core".to_string(), "Rest Central".to_string()],
                },
            ],
            imputer: None,
            metrics: None,
            output_unit: None,
            region_bands: None,
        }
    }

    #[test]
    fn test_normalize_property_type() {
        assert_eq!(normalize_property_type("office"), "Office");
        assert_eq!(normalize_property_type("  Warehouse "), "Warehouse");
        assert_eq!(normalize_property_type("logistics hub"), "Warehouse");
        assert_eq!(normalize_property_type("factory"), "Single-User Factory");
        assert_eq!(
            normalize_property_type("multi-user factory"),
            "Multiple-User Factory"
        );
        assert_eq!(normalize_property_type("shophouse"), "Shop House");
        assert_eq!(normalize_property_type("Strata Shop"), "Retail");
        // Unknown labels pass through
        assert_eq!(normalize_property_type("Hotel"), "Hotel");
    }

    #[test]
    fn test_parse_floor_level_variants() {
        assert_eq!(parse_floor_level(None), FloorLevel::Ground);
        assert_eq!(parse_floor_level(Some("Ground")), FloorLevel::Ground);
        assert_eq!(parse_floor_level(Some("g")), FloorLevel::Ground);
        assert_eq!(
            parse_floor_level(Some("B1")),
            FloorLevel::Basement { level: 1 }
        );
        assert_eq!(
            parse_floor_level(Some("Basement 2")),
            FloorLevel::Basement { level: 2 }
        );
        assert_eq!(
            parse_floor_level(Some("03-05")),
            FloorLevel::Numbered { low: 3, high: 5 }
        );
        assert_eq!(
            parse_floor_level(Some("06 to 10")),
            FloorLevel::Numbered { low: 6, high: 10 }
        );
        assert_eq!(
            parse_floor_level(Some("#12")),
            FloorLevel::Numbered { low: 12, high: 12 }
        );
        // Reversed ranges are normalized
        assert_eq!(
            parse_floor_level(Some("10-6")),
            FloorLevel::Numbered { low: 6, high: 10 }
        );
        // Garbage degrades to ground
        assert_eq!(parse_floor_level(Some("penthouse?")), FloorLevel::Ground);
    }

    #[test]
    fn test_vector_matches_schema_order() {
        let artifact = create_test_artifact(vec![
            "area_sqft",
            "postal_district",
            "property_type_Retail",
            "property_type_Warehouse",
            "region_Rest Central",
            "floor_mid",
        ]);
        let vector = build_feature_vector(&create_test_query(Some("03-05")), &create_test_geo(), &artifact);

        assert_eq!(vector.len(), 6);
        assert!((vector[0] - 1000.0).abs() < 1e-9);
        assert_eq!(vector[1], 1.0);
        // Office query: both Retail and Warehouse dummies are 0 (drop-first)
        assert_eq!(vector[2], 0.0);
        assert_eq!(vector[3], 0.0);
        assert_eq!(vector[4], 0.0);
        assert_eq!(vector[5], 4.0);
    }

    #[test]
    fn test_dummy_column_set_for_matching_category() {
        let artifact = create_test_artifact(vec!["property_type_Retail"]);
        let mut query = create_test_query(None);
        query.query.property_type = "Retail".to_string();
        let resolved = query.query.resolve();

        let vector = build_feature_vector(&resolved, &create_test_geo(), &artifact);
        assert_eq!(vector, vec![1.0]);
    }

    #[test]
    fn test_unknown_columns_get_neutral_defaults() {
        let artifact = create_test_artifact(vec![
            "gross_floor_area_sqft",
            "contract_year",
            "is_corner_unit",
            "completely_unknown",
        ]);
        let vector = build_feature_vector(&create_test_query(None), &create_test_geo(), &artifact);

        assert!((vector[0] - 1000.0).abs() < 1e-9);
        assert!(vector[1] >= 2024.0);
        assert_eq!(vector[2], 0.0);
        assert_eq!(vector[3], 0.0);
    }

    #[test]
    fn test_imputer_fills_unknown_column() {
        let mut artifact = create_test_artifact(vec!["completely_unknown"]);
        let mut fill = std::collections::HashMap::new();
        fill.insert("completely_unknown".to_string(), 42.0);
        artifact.imputer = Some(crate::models::Imputer { fill_values: fill });

        let vector = build_feature_vector(&create_test_query(None), &create_test_geo(), &artifact);
        assert_eq!(vector, vec![42.0]);
    }
}
