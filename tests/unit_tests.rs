// Unit tests for the valuation engine core

use valuation_engine::core::{
    district_from_address, extract_postal_code, haversine_distance, GeoFeatureCalculator,
    PredictionInterpreter,
};
use valuation_engine::core::{normalize_property_type, parse_floor_level};
use valuation_engine::config::BoundsSettings;
use valuation_engine::models::{FloorLevel, ModelCategory, Region, SQFT_TO_SQM};

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(1.2839, 103.8515, 1.2839, 103.8515);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_distance_across_island() {
    // Raffles Place to Woodlands is roughly 17-20 km
    let distance = haversine_distance(1.2840, 103.8515, 1.4370, 103.7865);
    assert!(distance > 15.0 && distance < 22.0, "got {}", distance);
}

#[test]
fn test_area_unit_round_trip() {
    let sqft = 1000.0;
    let sqm = sqft * SQFT_TO_SQM;
    let back = sqm / SQFT_TO_SQM;
    assert!((back - 1000.0).abs() < 1e-9);
}

#[test]
fn test_postal_code_extraction() {
    assert_eq!(extract_postal_code("7 Straits View 018956"), Some("018956"));
    assert_eq!(extract_postal_code("no code here"), None);
}

#[test]
fn test_district_resolution_defaults_to_one() {
    assert_eq!(district_from_address("address without postal code"), 1);
}

#[test]
fn test_marina_bay_is_central_core() {
    let calc = GeoFeatureCalculator::default();
    let geo = calc.compute("7 Straits View 018956", None);

    assert_eq!(geo.postal_district, 1);
    assert_eq!(geo.region, Region::CentralCore);
    assert!(geo.cbd_km < 1.0);
}

#[test]
fn test_floor_level_parser() {
    assert_eq!(parse_floor_level(Some("B1")), FloorLevel::Basement { level: 1 });
    assert_eq!(parse_floor_level(Some("Ground")), FloorLevel::Ground);
    assert_eq!(
        parse_floor_level(Some("06 to 10")),
        FloorLevel::Numbered { low: 6, high: 10 }
    );
}

#[test]
fn test_property_type_normalization() {
    assert_eq!(normalize_property_type("warehouse"), "Warehouse");
    assert_eq!(normalize_property_type("OFFICE"), "Office");
}

#[test]
fn test_interpreter_rejects_hopeless_negative() {
    let interpreter = PredictionInterpreter::new(BoundsSettings::default());
    let result = interpreter.interpret_sale(-0.5, ModelCategory::Commercial, 92.903, 1000.0, None);
    assert!(result.is_err());
}

#[test]
fn test_interpreter_commercial_psf_convention() {
    let interpreter = PredictionInterpreter::new(BoundsSettings::default());
    let total = interpreter
        .interpret_sale(1500.0, ModelCategory::Commercial, 92.903, 1000.0, None)
        .unwrap();
    assert!((total - 1_500_000.0).abs() < 1e-6);
}
