// Core algorithm exports
pub mod comparables;
pub mod estimator;
pub mod features;
pub mod geo;
pub mod interpret;
pub mod rng;
pub mod trend;

pub use comparables::{ComparableSample, ComparablesSampler, CorrectedPrice, NoComparables};
pub use estimator::ValuationEngine;
pub use features::{build_feature_vector, normalize_property_type, parse_floor_level};
pub use geo::{district_from_address, extract_postal_code, haversine_distance, GeoFeatureCalculator};
pub use interpret::{ImplausiblePrediction, PredictionInterpreter};
pub use trend::{MarketTrend, TrendEstimator};
