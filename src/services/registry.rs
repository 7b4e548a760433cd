use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{ModelArtifact, ModelCategory};

/// Errors that can occur while loading model artifacts
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Substrings that route a property type to the industrial category
const INDUSTRIAL_KEYWORDS: [&str; 6] = [
    "factory",
    "warehouse",
    "workshop",
    "industrial",
    "logistics",
    "storage",
];

/// Loads category model artifacts once per process and selects the right
/// one per query.
///
/// A category that fails to load is recorded as unavailable rather than
/// failing construction; the orchestrator skips unavailable categories and
/// falls through to its other tiers.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    commercial: Option<ModelArtifact>,
    industrial: Option<ModelArtifact>,
    rental: Option<ModelArtifact>,
}

impl ModelRegistry {
    /// Load `commercial.json`, `industrial.json` and `rental.json` from an
    /// artifact directory. Missing or unparseable artifacts are logged and
    /// skipped.
    pub fn load<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        let mut registry = Self::default();

        for (category, slot) in [
            (ModelCategory::Commercial, &mut registry.commercial),
            (ModelCategory::Industrial, &mut registry.industrial),
            (ModelCategory::Rental, &mut registry.rental),
        ] {
            let path = dir.join(artifact_file(category));
            match load_artifact(&path) {
                Ok(artifact) => {
                    info!(?category, path = %path.display(), "model artifact loaded");
                    *slot = Some(artifact);
                }
                Err(e) => {
                    warn!(?category, path = %path.display(), error = %e, "model artifact unavailable");
                }
            }
        }

        registry
    }

    /// Build a registry from artifacts the caller already holds, e.g. in
    /// tests or when the serving layer manages deserialization itself.
    pub fn from_artifacts(
        commercial: Option<ModelArtifact>,
        industrial: Option<ModelArtifact>,
        rental: Option<ModelArtifact>,
    ) -> Self {
        Self {
            commercial,
            industrial,
            rental,
        }
    }

    /// Classify a property type into its sale-model category. Ambiguous
    /// types default to commercial.
    pub fn classify(property_type: &str) -> ModelCategory {
        let lowered = property_type.to_lowercase();
        if INDUSTRIAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            ModelCategory::Industrial
        } else {
            ModelCategory::Commercial
        }
    }

    /// Select the sale artifact for a property type, together with the
    /// category it classified into. `None` when that category failed to load.
    pub fn select(&self, property_type: &str) -> (ModelCategory, Option<&ModelArtifact>) {
        let category = Self::classify(property_type);
        let artifact = match category {
            ModelCategory::Commercial => self.commercial.as_ref(),
            ModelCategory::Industrial => self.industrial.as_ref(),
            ModelCategory::Rental => None,
        };
        (category, artifact)
    }

    pub fn rental(&self) -> Option<&ModelArtifact> {
        self.rental.as_ref()
    }

    pub fn is_available(&self, category: ModelCategory) -> bool {
        match category {
            ModelCategory::Commercial => self.commercial.is_some(),
            ModelCategory::Industrial => self.industrial.is_some(),
            ModelCategory::Rental => self.rental.is_some(),
        }
    }

    pub fn available_categories(&self) -> Vec<ModelCategory> {
        [
            ModelCategory::Commercial,
            ModelCategory::Industrial,
            ModelCategory::Rental,
        ]
        .into_iter()
        .filter(|c| self.is_available(*c))
        .collect()
    }
}

fn artifact_file(category: ModelCategory) -> &'static str {
    match category {
        ModelCategory::Commercial => "commercial.json",
        ModelCategory::Industrial => "industrial.json",
        ModelCategory::Rental => "rental.json",
    }
}

fn load_artifact(path: &Path) -> Result<ModelArtifact, RegistryError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
