use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::models::{PredictionResult, PropertyQuery};

/// Bounded in-process memoization of prediction results.
///
/// Keyed by the full query tuple; repeated identical queries skip
/// recomputation. The cache is owned by the engine object, bounded at a
/// fixed capacity, and not shared across process restarts.
pub struct PredictionCache {
    inner: Mutex<LruCache<String, PredictionResult>>,
}

impl PredictionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<PredictionResult> {
        let mut cache = self.inner.lock().ok()?;
        let hit = cache.get(key).cloned();
        if hit.is_some() {
            tracing::trace!(key, "prediction cache hit");
        }
        hit
    }

    pub fn insert(&self, key: String, value: PredictionResult) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.put(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for PredictionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key covering every query field that affects the result.
    pub fn query(query: &PropertyQuery) -> String {
        format!(
            "{}|{}|{}|{:?}|{}|{}|{:?}",
            query.address,
            query.property_type,
            query.area,
            query.area_unit,
            query.floor_level.as_deref().unwrap_or("-"),
            query.unit.as_deref().unwrap_or("-"),
            query.tenure,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaUnit, Tenure, TrendSource};

    fn result(price: f64) -> PredictionResult {
        PredictionResult {
            estimated_sales_price: Some(price),
            sales_price_display: crate::models::format_price(price),
            sale_source: None,
            market_corrected: false,
            estimated_rental_price: None,
            rental_price_display: crate::models::UNAVAILABLE.to_string(),
            rental_source: None,
            market_trend: "+1.0%".to_string(),
            market_trend_percent: 1.0,
            trend_period_years: 4,
            trend_source: TrendSource::Synthetic,
            median_price_psf: None,
            highest_price_psf: None,
            comparable_transactions: vec![],
            is_synthetic: false,
        }
    }

    fn query(address: &str) -> PropertyQuery {
        PropertyQuery {
            address: address.to_string(),
            property_type: "Office".to_string(),
            area: 100.0,
            area_unit: AreaUnit::Sqm,
            floor_level: None,
            unit: None,
            tenure: Tenure::Unknown,
        }
    }

    #[test]
    fn test_cache_set_get() {
        let cache = PredictionCache::new(10);
        let key = CacheKey::query(&query("1 Test"));

        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), result(1_000_000.0));
        assert_eq!(
            cache.get(&key).unwrap().estimated_sales_price,
            Some(1_000_000.0)
        );
    }

    #[test]
    fn test_cache_bounded() {
        let cache = PredictionCache::new(3);
        for i in 0..10 {
            cache.insert(CacheKey::query(&query(&format!("addr {}", i))), result(1.0));
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_key_distinguishes_fields() {
        let a = CacheKey::query(&query("1 Test"));
        let mut q = query("1 Test");
        q.tenure = Tenure::Freehold;
        let b = CacheKey::query(&q);
        assert_ne!(a, b);
    }
}
