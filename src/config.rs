use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::models::RegionBands;

/// Engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub bounds: BoundsSettings,
    #[serde(default)]
    pub regions: RegionBands,
    #[serde(default)]
    pub comparables: ComparablesSettings,
    #[serde(default)]
    pub trend: TrendSettings,
    #[serde(default)]
    pub heuristic: HeuristicSettings,
    #[serde(default)]
    pub rental: RentalSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Plausibility band for total sale prices and their per-area equivalents
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PriceBand {
    #[serde(default)]
    pub psf_min: f64,
    #[serde(default)]
    pub psf_max: f64,
    #[serde(default)]
    pub total_min: f64,
    #[serde(default)]
    pub total_max: f64,
}

/// Plausibility band for monthly rental rates
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RentalBand {
    #[serde(default = "default_rental_psf_min")]
    pub psf_month_min: f64,
    #[serde(default = "default_rental_psf_max")]
    pub psf_month_max: f64,
}

impl Default for RentalBand {
    fn default() -> Self {
        Self {
            psf_month_min: default_rental_psf_min(),
            psf_month_max: default_rental_psf_max(),
        }
    }
}

fn default_rental_psf_min() -> f64 {
    1.0
}
fn default_rental_psf_max() -> f64 {
    20.0
}

/// Per-category plausibility bounds used by the prediction interpreter
#[derive(Debug, Clone, Deserialize)]
pub struct BoundsSettings {
    #[serde(default = "default_commercial_band")]
    pub commercial: PriceBand,
    #[serde(default = "default_industrial_band")]
    pub industrial: PriceBand,
    #[serde(default)]
    pub rental: RentalBand,
}

impl Default for BoundsSettings {
    fn default() -> Self {
        Self {
            commercial: default_commercial_band(),
            industrial: default_industrial_band(),
            rental: RentalBand::default(),
        }
    }
}

fn default_commercial_band() -> PriceBand {
    PriceBand {
        psf_min: 500.0,
        psf_max: 10_000.0,
        total_min: 500_000.0,
        total_max: 20_000_000.0,
    }
}

fn default_industrial_band() -> PriceBand {
    PriceBand {
        psf_min: 50.0,
        psf_max: 1_000.0,
        total_min: 50_000.0,
        total_max: 20_000_000.0,
    }
}

/// Comparables sampling and market-correction settings
#[derive(Debug, Clone, Deserialize)]
pub struct ComparablesSettings {
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Minimum rows the recency window must keep before widening.
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
    #[serde(default = "default_recency_months")]
    pub recency_months: u32,
    /// Relative PSF gap beyond which the market correction kicks in.
    #[serde(default = "default_correction_threshold")]
    pub correction_threshold: f64,
    #[serde(default = "default_model_weight")]
    pub model_weight: f64,
    #[serde(default = "default_market_weight")]
    pub market_weight: f64,
}

impl Default for ComparablesSettings {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            min_rows: default_min_rows(),
            recency_months: default_recency_months(),
            correction_threshold: default_correction_threshold(),
            model_weight: default_model_weight(),
            market_weight: default_market_weight(),
        }
    }
}

fn default_sample_size() -> usize {
    10
}
fn default_min_rows() -> usize {
    3
}
fn default_recency_months() -> u32 {
    12
}
fn default_correction_threshold() -> f64 {
    0.5
}
fn default_model_weight() -> f64 {
    0.3
}
fn default_market_weight() -> f64 {
    0.7
}

/// Trend estimation settings
#[derive(Debug, Clone, Deserialize)]
pub struct TrendSettings {
    #[serde(default = "default_window_years")]
    pub window_years: u8,
    /// Seeded volatility applied to the simulated series, in percent.
    #[serde(default = "default_volatility_pct")]
    pub volatility_pct: f64,
    /// Plausible synthetic trend range for commercial space, in percent.
    #[serde(default = "default_commercial_trend_range")]
    pub commercial_range: (f64, f64),
    #[serde(default = "default_industrial_trend_range")]
    pub industrial_range: (f64, f64),
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            window_years: default_window_years(),
            volatility_pct: default_volatility_pct(),
            commercial_range: default_commercial_trend_range(),
            industrial_range: default_industrial_trend_range(),
        }
    }
}

fn default_window_years() -> u8 {
    4
}
fn default_volatility_pct() -> f64 {
    3.0
}
fn default_commercial_trend_range() -> (f64, f64) {
    (-2.0, 8.0)
}
fn default_industrial_trend_range() -> (f64, f64) {
    (-4.0, 6.0)
}

/// Base price-per-square-foot rates per region, used by the
/// comparables-anchored heuristic tier
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RegionRates {
    pub central_core: f64,
    pub rest_central: f64,
    pub city_fringe: f64,
    pub outside_central: f64,
}

impl RegionRates {
    pub fn for_region(&self, region: crate::models::Region) -> f64 {
        match region {
            crate::models::Region::CentralCore => self.central_core,
            crate::models::Region::RestCentral => self.rest_central,
            crate::models::Region::CityFringe => self.city_fringe,
            crate::models::Region::OutsideCentral => self.outside_central,
        }
    }
}

/// Heuristic fallback pricing settings
#[derive(Debug, Clone, Deserialize)]
pub struct HeuristicSettings {
    #[serde(default = "default_commercial_rates")]
    pub commercial: RegionRates,
    #[serde(default = "default_industrial_rates")]
    pub industrial: RegionRates,
    /// Seeded jitter around the base rate, as a fraction.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for HeuristicSettings {
    fn default() -> Self {
        Self {
            commercial: default_commercial_rates(),
            industrial: default_industrial_rates(),
            jitter: default_jitter(),
        }
    }
}

fn default_commercial_rates() -> RegionRates {
    RegionRates {
        central_core: 2_800.0,
        rest_central: 2_200.0,
        city_fringe: 1_700.0,
        outside_central: 1_300.0,
    }
}

fn default_industrial_rates() -> RegionRates {
    RegionRates {
        central_core: 620.0,
        rest_central: 520.0,
        city_fringe: 430.0,
        outside_central: 350.0,
    }
}

fn default_jitter() -> f64 {
    0.05
}

/// Rental fallback settings
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RentalSettings {
    /// Rule-of-thumb monthly rent as a fraction of the sale price.
    #[serde(default = "default_sale_fraction")]
    pub sale_fraction_monthly: f64,
}

impl Default for RentalSettings {
    fn default() -> Self {
        Self {
            sale_fraction_monthly: default_sale_fraction(),
        }
    }
}

fn default_sale_fraction() -> f64 {
    0.004
}

/// Prediction cache settings
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with VALUATION_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with VALUATION_)
            // e.g., VALUATION_CACHE__CAPACITY -> cache.capacity
            .add_source(
                Environment::with_prefix("VALUATION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("VALUATION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
