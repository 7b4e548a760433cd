use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::core::comparables::{ComparableSample, ComparablesSampler};
use crate::core::features::{build_feature_vector, normalize_property_type, parse_floor_level};
use crate::core::geo::GeoFeatureCalculator;
use crate::core::interpret::PredictionInterpreter;
use crate::core::trend::TrendEstimator;
use crate::models::{
    format_price, format_rental, GeoFeatures, LinearModel, ModelArtifact, ModelArtifactFormat,
    ModelCategory, PredictionResult, PropertyQuery, RentalPriceSource, ResolvedQuery,
    SalePriceSource, UNAVAILABLE,
};
use crate::core::rng::{seed_from, SeededRng};
use crate::services::cache::{CacheKey, PredictionCache};
use crate::services::corpus::{AreaBand, FloorBand, RentalRateTable, TransactionCorpus};
use crate::services::registry::ModelRegistry;

/// Property valuation engine.
///
/// The single service object constructed at process start and passed by
/// reference to every request handler. Owns the loaded model artifacts, the
/// transaction corpus, the rental reference table and the bounded
/// prediction cache; all of it is immutable after construction (the cache
/// synchronizes internally), so the engine is safe to share across worker
/// threads.
///
/// # Fallback chains
/// Sale: property-type sub-model, then the combined category model, then a
/// market-anchored heuristic. Rental: dedicated rental model, then the
/// market rate table (retail/office), then a fixed fraction of the resolved
/// sale price. A rejected prediction advances the chain exactly like a
/// missing model; no error escapes `estimate`.
pub struct ValuationEngine {
    settings: Settings,
    registry: ModelRegistry,
    corpus: TransactionCorpus,
    rental_rates: RentalRateTable,
    geo: GeoFeatureCalculator,
    interpreter: PredictionInterpreter,
    sampler: ComparablesSampler,
    trend: TrendEstimator,
    cache: PredictionCache,
}

impl ValuationEngine {
    pub fn new(
        settings: Settings,
        registry: ModelRegistry,
        corpus: TransactionCorpus,
        rental_rates: RentalRateTable,
    ) -> Self {
        let geo = GeoFeatureCalculator::new(settings.regions);
        let interpreter = PredictionInterpreter::new(settings.bounds.clone());
        let sampler = ComparablesSampler::new(settings.comparables.clone());
        let trend = TrendEstimator::new(settings.trend.clone());
        let cache = PredictionCache::new(settings.cache.capacity);

        Self {
            settings,
            registry,
            corpus,
            rental_rates,
            geo,
            interpreter,
            sampler,
            trend,
            cache,
        }
    }

    /// Estimate sale price, rental price, market trend and comparables for
    /// one query. Always returns a best-effort result; a side whose every
    /// tier failed surfaces as `None` plus an "Unavailable" display string.
    pub fn estimate(&self, query: &PropertyQuery) -> PredictionResult {
        self.estimate_at(query, Utc::now().date_naive())
    }

    /// Like [`estimate`](Self::estimate) with an explicit reference date,
    /// which recency filtering and trend windows are computed against.
    pub fn estimate_at(&self, query: &PropertyQuery, today: NaiveDate) -> PredictionResult {
        let key = CacheKey::query(query);
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        let resolved = query.resolve();
        let geo = self.geo.compute(&query.address, None);
        let property_type = normalize_property_type(&query.property_type);
        let category = ModelRegistry::classify(&property_type);

        let (sale, sale_source) = self.estimate_sale(&resolved, &geo, &property_type, category);

        let (sample, comparables_synthetic) =
            self.comparables_for(&resolved, &geo, &property_type, sale, today);

        // Market correction applies to model-derived prices only; the
        // heuristic tier is already anchored on market rates.
        let (sale, market_corrected) = match (sale, sale_source, &sample) {
            (Some(total), Some(source), Some(sample)) if source != SalePriceSource::MarketHeuristic => {
                let corrected = self.sampler.correct_price(total, resolved.area_sqft, sample);
                (Some(corrected.total), corrected.corrected)
            }
            (sale, _, _) => (sale, false),
        };

        let (rental, rental_source) =
            self.estimate_rental(&resolved, &geo, &property_type, sale);

        let trend = self.trend.estimate(
            &self.corpus,
            &property_type,
            geo.postal_district,
            None,
            sale,
            category,
            geo.region,
            today,
        );

        let result = PredictionResult {
            estimated_sales_price: sale,
            sales_price_display: sale.map(format_price).unwrap_or_else(|| UNAVAILABLE.to_string()),
            sale_source,
            market_corrected,
            estimated_rental_price: rental,
            rental_price_display: rental
                .map(format_rental)
                .unwrap_or_else(|| UNAVAILABLE.to_string()),
            rental_source,
            market_trend: trend.display,
            market_trend_percent: trend.percent,
            trend_period_years: trend.period_years,
            trend_source: trend.source,
            median_price_psf: sample.as_ref().map(|s| s.median_psf),
            highest_price_psf: sample.as_ref().map(|s| s.max_psf),
            comparable_transactions: sample.map(|s| s.rows).unwrap_or_default(),
            is_synthetic: comparables_synthetic,
        };

        self.cache.insert(key, result.clone());
        result
    }

    /// Sale fallback chain: exact sub-model, category model, heuristic.
    fn estimate_sale(
        &self,
        resolved: &ResolvedQuery,
        geo: &GeoFeatures,
        property_type: &str,
        category: ModelCategory,
    ) -> (Option<f64>, Option<SalePriceSource>) {
        let (_, artifact) = self.registry.select(property_type);

        if let Some(artifact) = artifact {
            let features = self.features_for(resolved, geo, artifact);

            if let Some(model) = artifact.exact_model_for(property_type) {
                match self.run_sale_model(model, &features, artifact, category, resolved) {
                    Some(total) => return (Some(total), Some(SalePriceSource::PropertyTypeModel)),
                    None => debug!(property_type, "sub-model rejected, trying category model"),
                }
            }

            if let Some(model) = category_model(artifact) {
                match self.run_sale_model(model, &features, artifact, category, resolved) {
                    Some(total) => return (Some(total), Some(SalePriceSource::CategoryModel)),
                    None => debug!(property_type, "category model rejected, using heuristic"),
                }
            }
        } else {
            warn!(property_type, ?category, "no sale model available");
        }

        let total = self.heuristic_sale(resolved, geo, property_type, category);
        (Some(total), Some(SalePriceSource::MarketHeuristic))
    }

    fn run_sale_model(
        &self,
        model: &LinearModel,
        features: &[f64],
        artifact: &ModelArtifact,
        category: ModelCategory,
        resolved: &ResolvedQuery,
    ) -> Option<f64> {
        let raw = model.predict(features);
        self.interpreter
            .interpret_sale(
                raw,
                category,
                resolved.area_sqm,
                resolved.area_sqft,
                artifact.output_unit,
            )
            .ok()
    }

    /// Category/region base rate times area, with a small seeded jitter so
    /// the fallback does not look artificially flat across queries.
    fn heuristic_sale(
        &self,
        resolved: &ResolvedQuery,
        geo: &GeoFeatures,
        property_type: &str,
        category: ModelCategory,
    ) -> f64 {
        let rates = match category {
            ModelCategory::Industrial => &self.settings.heuristic.industrial,
            ModelCategory::Commercial | ModelCategory::Rental => &self.settings.heuristic.commercial,
        };
        let base_psf = rates.for_region(geo.region);

        let mut rng = SeededRng::new(seed_from(&(
            "heuristic",
            property_type,
            geo.postal_district,
            resolved.area_sqm.to_bits(),
        )));
        let jitter = self.settings.heuristic.jitter;
        let psf = base_psf * (1.0 + rng.range_f64(-jitter, jitter));

        psf * resolved.area_sqft
    }

    /// Rental fallback chain: rental model, market rate table, fraction of
    /// the sale price.
    fn estimate_rental(
        &self,
        resolved: &ResolvedQuery,
        geo: &GeoFeatures,
        property_type: &str,
        sale: Option<f64>,
    ) -> (Option<f64>, Option<RentalPriceSource>) {
        if let Some(artifact) = self.registry.rental() {
            let features = self.features_for(resolved, geo, artifact);
            if let Some(model) = artifact
                .exact_model_for(property_type)
                .or_else(|| category_model(artifact))
            {
                let raw = model.predict(&features);
                match self
                    .interpreter
                    .interpret_rental(raw, resolved.area_sqft, artifact.output_unit)
                {
                    Ok(rent) => return (Some(rent), Some(RentalPriceSource::RentalModel)),
                    Err(e) => debug!(%e, "rental model rejected, trying rate table"),
                }
            }
        }

        // The reference table only covers retail and office space.
        if matches!(property_type, "Retail" | "Office") {
            let floor = parse_floor_level(resolved.query.floor_level.as_deref());
            if let Some(psm_month) = self.rental_rates.lookup(
                property_type,
                geo.postal_district,
                FloorBand::from_level(&floor),
                AreaBand::from_sqm(resolved.area_sqm),
                None,
            ) {
                let rent = psm_month * resolved.area_sqm;
                return (Some(rent), Some(RentalPriceSource::MarketRateTable));
            }
        }

        match sale {
            Some(sale_total) => {
                let rent = sale_total * self.settings.rental.sale_fraction_monthly;
                (Some(rent), Some(RentalPriceSource::FractionOfSale))
            }
            None => (None, None),
        }
    }

    /// Sample real comparables, degrading to seeded synthetic rows flagged
    /// as such when the corpus has nothing usable.
    fn comparables_for(
        &self,
        resolved: &ResolvedQuery,
        geo: &GeoFeatures,
        property_type: &str,
        sale: Option<f64>,
        today: NaiveDate,
    ) -> (Option<ComparableSample>, bool) {
        match self.sampler.sample(
            &self.corpus,
            property_type,
            geo.postal_district,
            None,
            resolved.area_sqm,
            today,
        ) {
            Ok(sample) => (Some(sample), false),
            Err(e) => {
                warn!(%e, property_type, "falling back to synthetic comparables");
                let reference_psf = match sale {
                    Some(total) if resolved.area_sqft > 0.0 => total / resolved.area_sqft,
                    _ => return (None, false),
                };
                let sample = self.sampler.synthesize(
                    property_type,
                    geo.postal_district,
                    resolved.area_sqm,
                    reference_psf,
                    today,
                );
                (Some(sample), true)
            }
        }
    }

    /// Build the feature vector against an artifact's schema, honoring the
    /// band convention the artifact was trained with.
    fn features_for(
        &self,
        resolved: &ResolvedQuery,
        geo: &GeoFeatures,
        artifact: &ModelArtifact,
    ) -> Vec<f64> {
        let geo_for_artifact = match artifact.region_bands {
            Some(bands) => {
                let mut adjusted = geo.clone();
                adjusted.region = bands.classify(geo.postal_district);
                adjusted
            }
            None => geo.clone(),
        };
        build_feature_vector(resolved, &geo_for_artifact, artifact)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// The artifact's category-wide model: the combined model, or the recorded
/// default sub-model for per-type artifacts.
fn category_model(artifact: &ModelArtifact) -> Option<&LinearModel> {
    match &artifact.format {
        ModelArtifactFormat::Combined { model } => Some(model),
        ModelArtifactFormat::PerPropertyType {
            models,
            default_type,
        } => models.get(default_type),
    }
}
