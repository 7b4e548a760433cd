// Service exports
pub mod cache;
pub mod corpus;
pub mod registry;

pub use cache::{CacheKey, PredictionCache};
pub use corpus::{
    AreaBand, CorpusError, FloorBand, RentalRateRow, RentalRateTable, TransactionCorpus,
};
pub use registry::{ModelRegistry, RegistryError};
