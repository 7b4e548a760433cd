use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which fallback tier produced the sale price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalePriceSource {
    PropertyTypeModel,
    CategoryModel,
    MarketHeuristic,
}

/// Which fallback tier produced the rental price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalPriceSource {
    RentalModel,
    MarketRateTable,
    FractionOfSale,
}

/// How the market trend was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendSource {
    HistoricalData,
    ModelSimulated,
    Synthetic,
}

/// One comparable transaction, shaped for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableTransaction {
    #[serde(rename = "propertyType")]
    pub property_type: String,
    #[serde(rename = "postalDistrict")]
    pub postal_district: u8,
    pub project: Option<String>,
    pub street: Option<String>,
    #[serde(rename = "areaSqm")]
    pub area_sqm: f64,
    pub price: f64,
    #[serde(rename = "pricePsf")]
    pub price_psf: f64,
    #[serde(rename = "contractDate")]
    pub contract_date: NaiveDate,
}

/// Full valuation answer for one query. Every field is best-effort; sides
/// that exhausted all fallback tiers surface as `None` with an
/// "Unavailable" display string rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "estimatedSalesPrice")]
    pub estimated_sales_price: Option<f64>,
    #[serde(rename = "salesPriceDisplay")]
    pub sales_price_display: String,
    #[serde(rename = "saleSource")]
    pub sale_source: Option<SalePriceSource>,
    /// Whether the comparables median materially corrected the model price.
    #[serde(rename = "marketCorrected")]
    pub market_corrected: bool,

    #[serde(rename = "estimatedRentalPrice")]
    pub estimated_rental_price: Option<f64>,
    #[serde(rename = "rentalPriceDisplay")]
    pub rental_price_display: String,
    #[serde(rename = "rentalSource")]
    pub rental_source: Option<RentalPriceSource>,

    #[serde(rename = "marketTrend")]
    pub market_trend: String,
    #[serde(rename = "marketTrendPercent")]
    pub market_trend_percent: f64,
    #[serde(rename = "trendPeriodYears")]
    pub trend_period_years: u8,
    #[serde(rename = "trendSource")]
    pub trend_source: TrendSource,

    #[serde(rename = "medianPricePsf")]
    pub median_price_psf: Option<f64>,
    #[serde(rename = "highestPricePsf")]
    pub highest_price_psf: Option<f64>,
    #[serde(rename = "comparableTransactions")]
    pub comparable_transactions: Vec<ComparableTransaction>,
    /// True when the comparables are fabricated placeholders rather than
    /// real corpus rows.
    #[serde(rename = "isSynthetic")]
    pub is_synthetic: bool,
}

/// Display formatting for sale amounts: "$2.4M" at a million and above,
/// "$850k" below.
pub fn format_price(amount: f64) -> String {
    if amount >= 1_000_000.0 {
        format!("${:.1}M", amount / 1_000_000.0)
    } else {
        format!("${:.0}k", amount / 1_000.0)
    }
}

/// Display formatting for monthly rental amounts
pub fn format_rental(amount: f64) -> String {
    if amount >= 1_000.0 {
        format!("${:.1}k/month", amount / 1_000.0)
    } else {
        format!("${:.0}/month", amount)
    }
}

pub const UNAVAILABLE: &str = "Unavailable";
