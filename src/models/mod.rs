// Model exports
pub mod artifact;
pub mod domain;
pub mod responses;

pub use artifact::{
    CategoricalColumn, Imputer, LinearModel, ModelArtifact, ModelArtifactFormat, ModelMetrics,
    OutputUnit,
};
pub use domain::{
    AreaUnit, FloorLevel, GeoFeatures, ModelCategory, PropertyQuery, Region, RegionBands,
    ResolvedQuery, Tenure, TransactionRecord, SQFT_TO_SQM,
};
pub use responses::{
    format_price, format_rental, ComparableTransaction, PredictionResult, RentalPriceSource,
    SalePriceSource, TrendSource, UNAVAILABLE,
};
