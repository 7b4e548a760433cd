use chrono::{Months, NaiveDate};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ComparablesSettings;
use crate::core::rng::{seed_from, SeededRng};
use crate::models::{ComparableTransaction, TransactionRecord, SQFT_TO_SQM};
use crate::services::corpus::TransactionCorpus;

/// Filtered transaction set empty after every filter-relaxation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no comparable transactions after all filter relaxations")]
pub struct NoComparables;

/// A deterministic sample of comparable transactions with its per-area
/// benchmark statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ComparableSample {
    pub rows: Vec<ComparableTransaction>,
    pub median_psf: f64,
    pub max_psf: f64,
    pub is_synthetic: bool,
}

/// Outcome of the market correction step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedPrice {
    pub total: f64,
    pub corrected: bool,
}

/// Samples historical transactions for benchmark statistics and display.
///
/// Filtering relaxes in fixed precedence until rows remain: district and
/// property type together, then district alone, then property type alone,
/// then planning area alone. Sampling is seeded by the query inputs so
/// identical queries always see the identical sample.
#[derive(Debug, Clone)]
pub struct ComparablesSampler {
    cfg: ComparablesSettings,
}

impl ComparablesSampler {
    pub fn new(cfg: ComparablesSettings) -> Self {
        Self { cfg }
    }

    /// Deterministically sample up to `sample_size` comparables.
    pub fn sample(
        &self,
        corpus: &TransactionCorpus,
        property_type: &str,
        postal_district: u8,
        planning_area: Option<&str>,
        area_sqm: f64,
        today: NaiveDate,
    ) -> Result<ComparableSample, NoComparables> {
        let tiers: [Vec<&TransactionRecord>; 4] = [
            corpus.by_district_and_type(postal_district, property_type),
            corpus.by_district(postal_district),
            corpus.by_type(property_type),
            planning_area
                .map(|area| corpus.by_planning_area(area))
                .unwrap_or_default(),
        ];

        let filtered = tiers.into_iter().find(|rows| !rows.is_empty());
        let Some(filtered) = filtered else {
            warn!(property_type, postal_district, "no comparables found");
            return Err(NoComparables);
        };

        let rows = self.apply_recency(filtered, today);
        let seed = seed_from(&(
            property_type,
            postal_district,
            area_sqm.to_bits(),
        ));
        let sampled = sample_rows(&rows, self.cfg.sample_size, seed);

        let psfs: Vec<f64> = sampled.iter().filter_map(|r| r.psf()).collect();
        if psfs.is_empty() {
            warn!(property_type, postal_district, "comparables carry no usable prices");
            return Err(NoComparables);
        }

        Ok(ComparableSample {
            rows: sampled.iter().map(|r| to_display(r)).collect(),
            median_psf: median(&psfs),
            max_psf: psfs.iter().cloned().fold(f64::MIN, f64::max),
            is_synthetic: false,
        })
    }

    /// Restrict to the recency window, widening back to the full filtered
    /// set when too few recent rows remain.
    fn apply_recency<'a>(
        &self,
        rows: Vec<&'a TransactionRecord>,
        today: NaiveDate,
    ) -> Vec<&'a TransactionRecord> {
        let cutoff = today
            .checked_sub_months(Months::new(self.cfg.recency_months))
            .unwrap_or(today);
        let recent: Vec<&TransactionRecord> = rows
            .iter()
            .copied()
            .filter(|r| r.contract_date >= cutoff)
            .collect();

        if recent.len() >= self.cfg.min_rows {
            recent
        } else {
            debug!(
                recent = recent.len(),
                total = rows.len(),
                "too few recent rows, widening to full corpus window"
            );
            rows
        }
    }

    /// Blend a model-implied price toward the market median when the two
    /// disagree materially. Applied symmetrically whether the model is over-
    /// or under-predicting.
    pub fn correct_price(
        &self,
        model_total: f64,
        area_sqft: f64,
        sample: &ComparableSample,
    ) -> CorrectedPrice {
        if area_sqft <= 0.0 || sample.median_psf <= 0.0 || sample.is_synthetic {
            return CorrectedPrice {
                total: model_total,
                corrected: false,
            };
        }

        let model_psf = model_total / area_sqft;
        let gap = (model_psf - sample.median_psf).abs() / sample.median_psf;
        if gap <= self.cfg.correction_threshold {
            return CorrectedPrice {
                total: model_total,
                corrected: false,
            };
        }

        let blended_psf =
            self.cfg.model_weight * model_psf + self.cfg.market_weight * sample.median_psf;
        debug!(model_psf, market_psf = sample.median_psf, blended_psf, "market-correcting price");
        CorrectedPrice {
            total: blended_psf * area_sqft,
            corrected: true,
        }
    }

    /// Fabricate reproducible placeholder comparables around a reference
    /// price-per-area when the corpus has nothing usable. Rows are flagged
    /// synthetic so callers can distinguish them from real transactions.
    pub fn synthesize(
        &self,
        property_type: &str,
        postal_district: u8,
        area_sqm: f64,
        reference_psf: f64,
        today: NaiveDate,
    ) -> ComparableSample {
        let mut rng = SeededRng::new(seed_from(&(
            property_type,
            postal_district,
            area_sqm.to_bits(),
        )));

        let count = 5;
        let mut rows = Vec::with_capacity(count);
        let mut psfs = Vec::with_capacity(count);
        for _ in 0..count {
            let psf = reference_psf * rng.range_f64(0.8, 1.2);
            let row_area_sqm = (area_sqm * rng.range_f64(0.7, 1.3)).max(10.0);
            let price = psf * (row_area_sqm / SQFT_TO_SQM);
            let months_back = rng.next_usize(12) as u32;
            let date = today
                .checked_sub_months(Months::new(months_back))
                .unwrap_or(today);

            psfs.push(psf);
            rows.push(ComparableTransaction {
                property_type: property_type.to_string(),
                postal_district,
                project: None,
                street: Some(format!("District {} (indicative)", postal_district)),
                area_sqm: row_area_sqm,
                price,
                price_psf: psf,
                contract_date: date,
            });
        }

        ComparableSample {
            median_psf: median(&psfs),
            max_psf: psfs.iter().cloned().fold(f64::MIN, f64::max),
            rows,
            is_synthetic: true,
        }
    }
}

/// Deterministic partial Fisher-Yates draw of up to `count` rows
fn sample_rows<'a>(
    rows: &[&'a TransactionRecord],
    count: usize,
    seed: u64,
) -> Vec<&'a TransactionRecord> {
    if rows.len() <= count {
        return rows.to_vec();
    }

    let mut rng = SeededRng::new(seed);
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    for i in 0..count {
        let j = i + rng.next_usize(indices.len() - i);
        indices.swap(i, j);
    }
    indices[..count].iter().map(|&i| rows[i]).collect()
}

fn to_display(record: &TransactionRecord) -> ComparableTransaction {
    ComparableTransaction {
        property_type: record.property_type.clone(),
        postal_district: record.postal_district,
        project: record.project.clone(),
        street: record.street.clone(),
        area_sqm: record.area_sqm,
        price: record.price,
        price_psf: record.psf().unwrap_or(0.0),
        contract_date: record.contract_date,
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
