use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{BoundsSettings, PriceBand, RentalBand};
use crate::models::{ModelCategory, OutputUnit, SQFT_TO_SQM};

/// Raw model output rejected as implausible under every candidate
/// interpretation
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("raw output {raw} has no plausible interpretation for {category:?}")]
pub struct ImplausiblePrediction {
    pub raw: f64,
    pub category: ModelCategory,
}

/// Offset applied as the second-ranked reinterpretation of a negative raw
/// output, after absolute value
const NEGATIVE_REINTERPRET_OFFSET: f64 = 1_000_000.0;

/// Disambiguates a raw regression output's unit and converts it to a
/// canonical total price.
///
/// A raw output may be a total price, a price per square foot, or a price
/// per square meter; which one is a property of how the artifact was
/// trained and is not always recorded. Candidate interpretations are
/// evaluated in ranked order against per-category plausibility bounds, with
/// the artifact's explicit output unit (when present) ranked first.
#[derive(Debug, Clone)]
pub struct PredictionInterpreter {
    bounds: BoundsSettings,
}

impl PredictionInterpreter {
    pub fn new(bounds: BoundsSettings) -> Self {
        Self { bounds }
    }

    fn band(&self, category: ModelCategory) -> &PriceBand {
        match category {
            ModelCategory::Industrial => &self.bounds.industrial,
            // Rental artifacts share the commercial sale band when asked for
            // a total-price interpretation; callers use interpret_rental.
            ModelCategory::Commercial | ModelCategory::Rental => &self.bounds.commercial,
        }
    }

    /// Candidate units in ranked order for a category, with the recorded
    /// output unit (when the artifact carries one) promoted to the front.
    fn ranked_units(category: ModelCategory, recorded: Option<OutputUnit>) -> Vec<OutputUnit> {
        let mut units = match category {
            // Commercial models were trained on price per square foot
            ModelCategory::Commercial | ModelCategory::Rental => vec![
                OutputUnit::PerSquareFoot,
                OutputUnit::TotalPrice,
                OutputUnit::PerSquareMeter,
            ],
            // Industrial models emit the total price directly
            ModelCategory::Industrial => vec![
                OutputUnit::TotalPrice,
                OutputUnit::PerSquareFoot,
                OutputUnit::PerSquareMeter,
            ],
        };
        if let Some(unit) = recorded {
            units.retain(|u| *u != unit);
            units.insert(0, unit);
        }
        units
    }

    fn total_for(unit: OutputUnit, raw: f64, area_sqm: f64, area_sqft: f64) -> f64 {
        match unit {
            OutputUnit::TotalPrice => raw,
            OutputUnit::PerSquareFoot => raw * area_sqft,
            OutputUnit::PerSquareMeter => raw * area_sqm,
            // Rental artifacts go through interpret_rental; a monthly unit
            // reaching the sale path reads as a plain per-sqft rate.
            OutputUnit::PerSquareFootMonthly => raw * area_sqft,
        }
    }

    /// Interpret a raw sale-model output into a canonical total price.
    ///
    /// Non-negative outputs resolve to the first in-band candidate, falling
    /// back to the convention-ranked first candidate clamped into the total
    /// band. Negative outputs are only accepted through a bounded
    /// reinterpretation (absolute value, then a fixed offset) that lands
    /// strictly inside the band; otherwise the prediction is rejected.
    pub fn interpret_sale(
        &self,
        raw: f64,
        category: ModelCategory,
        area_sqm: f64,
        area_sqft: f64,
        recorded_unit: Option<OutputUnit>,
    ) -> Result<f64, ImplausiblePrediction> {
        let band = self.band(category);

        if raw < 0.0 {
            // Bounded reinterpretation of a negative output, evaluated only
            // in the unit the category was trained on. Never clamp a
            // negative value into range: either a reinterpretation is
            // plausible on its own, or the prediction is unusable.
            let unit = Self::ranked_units(category, recorded_unit)[0];
            for candidate in [-raw, raw + NEGATIVE_REINTERPRET_OFFSET] {
                if candidate <= 0.0 {
                    continue;
                }
                let total = Self::total_for(unit, candidate, area_sqm, area_sqft);
                if self.in_band(band, total, area_sqft) {
                    debug!(raw, total, ?unit, "negative output reinterpreted");
                    return Ok(total);
                }
            }
            warn!(raw, ?category, "rejecting negative model output");
            return Err(ImplausiblePrediction { raw, category });
        }

        let units = Self::ranked_units(category, recorded_unit);
        for unit in &units {
            let total = Self::total_for(*unit, raw, area_sqm, area_sqft);
            if self.in_band(band, total, area_sqft) {
                return Ok(total);
            }
        }

        // No candidate is fully plausible; keep the convention-ranked
        // interpretation and clamp it into the total band rather than
        // dropping the prediction.
        let total = Self::total_for(units[0], raw, area_sqm, area_sqft);
        let clamped = total.clamp(band.total_min, band.total_max);
        debug!(raw, total, clamped, ?category, "clamped out-of-band prediction");
        Ok(clamped)
    }

    fn in_band(&self, band: &PriceBand, total: f64, area_sqft: f64) -> bool {
        if area_sqft <= 0.0 {
            return false;
        }
        let psf = total / area_sqft;
        psf >= band.psf_min && psf <= band.psf_max && total >= band.total_min && total <= band.total_max
    }

    /// Interpret a raw rental-model output into a canonical monthly rent.
    ///
    /// Follows the sale pattern with a price-per-square-foot-per-month
    /// convention: negatives need an in-band reinterpretation, in-range
    /// monthly PSF is accepted directly, and out-of-band PSF is clamped
    /// into the configured band.
    pub fn interpret_rental(
        &self,
        raw: f64,
        area_sqft: f64,
        recorded_unit: Option<OutputUnit>,
    ) -> Result<f64, ImplausiblePrediction> {
        let band = &self.bounds.rental;

        if area_sqft <= 0.0 {
            return Err(ImplausiblePrediction {
                raw,
                category: ModelCategory::Rental,
            });
        }

        if raw < 0.0 {
            for candidate in [-raw, raw + NEGATIVE_REINTERPRET_OFFSET] {
                if candidate <= 0.0 {
                    continue;
                }
                if let Some(rent) = self.rental_candidate(band, candidate, area_sqft, recorded_unit, false) {
                    debug!(raw, rent, "negative rental output reinterpreted");
                    return Ok(rent);
                }
            }
            warn!(raw, "rejecting negative rental model output");
            return Err(ImplausiblePrediction {
                raw,
                category: ModelCategory::Rental,
            });
        }

        // Positive outputs are always usable after clamping.
        Ok(self
            .rental_candidate(band, raw, area_sqft, recorded_unit, true)
            .unwrap_or(band.psf_month_min * area_sqft))
    }

    /// Evaluate one rental candidate; with `clamp` the monthly PSF is forced
    /// into the band, without it an out-of-band candidate is discarded.
    fn rental_candidate(
        &self,
        band: &RentalBand,
        raw: f64,
        area_sqft: f64,
        recorded_unit: Option<OutputUnit>,
        clamp: bool,
    ) -> Option<f64> {
        // Rental reference data is quoted per square meter, so artifacts may
        // record a per-sqm output; convert before banding.
        let psf_month = match recorded_unit {
            Some(OutputUnit::PerSquareMeter) => raw * SQFT_TO_SQM,
            Some(OutputUnit::TotalPrice) => raw / area_sqft,
            _ => raw,
        };

        if clamp {
            let clamped = psf_month.clamp(band.psf_month_min, band.psf_month_max);
            return Some(clamped * area_sqft);
        }
        if psf_month >= band.psf_month_min && psf_month <= band.psf_month_max {
            Some(psf_month * area_sqft)
        } else {
            None
        }
    }
}
