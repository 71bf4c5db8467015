// Inference pipeline: URL -> features -> scaled row -> score -> label.
//
// The extractor, scaler and model are built independently, so nothing
// guarantees they agree on which features exist or in what order. That is
// checked once, when the pipeline is assembled, and the resulting column
// order is reused for every URL.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{validate_threshold, Config};
use crate::features::traits::FeatureExtractor;
use crate::model::load_classifier;
use crate::model::traits::Classifier;
use crate::scaling::{self, Scaler};

/// Binary classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Benign,
    Phishing,
}

impl Label {
    /// Label a score. Strictly greater than the threshold is phishing, so a
    /// score exactly at the threshold is benign.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            Label::Phishing
        } else {
            Label::Benign
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Benign => "BENIGN",
            Label::Phishing => "PHISHING",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The result of classifying one URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub url: String,
    pub score: f64,
    pub label: Label,
}

/// Work out where each scaler column comes from in the extractor's output.
///
/// With named scaler columns the names must match the extractor's exactly
/// (any order). Without names only the counts can be compared. The model's
/// expected width, when known, must equal the scaler's.
pub fn column_order(
    extractor_names: &[&str],
    scaler: &Scaler,
    model: &dyn Classifier,
) -> Result<Vec<usize>> {
    let order: Vec<usize> = match scaler.feature_names() {
        Some(names) => {
            let missing: Vec<&str> = names
                .iter()
                .map(String::as_str)
                .filter(|name| !extractor_names.contains(name))
                .collect();
            if !missing.is_empty() {
                anyhow::bail!(
                    "Scaler expects features the extractor doesn't produce: {}",
                    missing.join(", ")
                );
            }

            let unexpected: Vec<&str> = extractor_names
                .iter()
                .copied()
                .filter(|name| !names.iter().any(|n| n == *name))
                .collect();
            if !unexpected.is_empty() {
                anyhow::bail!(
                    "Extractor produces features the scaler wasn't fitted on: {}",
                    unexpected.join(", ")
                );
            }

            names
                .iter()
                .filter_map(|name| extractor_names.iter().position(|n| n == name))
                .collect()
        }
        None => {
            if extractor_names.len() != scaler.width() {
                anyhow::bail!(
                    "Feature shape mismatch: extractor produces {} features, scaler expects {}",
                    extractor_names.len(),
                    scaler.width()
                );
            }
            warn!("Scaler records no feature names; assuming extractor order matches");
            (0..scaler.width()).collect()
        }
    };

    if let Some(expected) = model.expected_features() {
        if expected != scaler.width() {
            anyhow::bail!(
                "Feature shape mismatch: scaler produces {} features, model expects {}",
                scaler.width(),
                expected
            );
        }
    }

    // Models trained on scaled numpy arrays only know generic column names
    if let (Some(model_names), Some(scaler_names)) = (model.feature_names(), scaler.feature_names()) {
        let generic = model_names.iter().all(|n| n.starts_with("Column_"));
        if !generic && model_names != scaler_names {
            warn!("Model and scaler feature names differ; relying on column position");
        }
    }

    Ok(order)
}

/// Extractor, scaler and model assembled for classification.
pub struct Pipeline {
    extractor: Box<dyn FeatureExtractor>,
    scaler: Scaler,
    model: Box<dyn Classifier>,
    column_order: Vec<usize>,
    threshold: f64,
}

impl Pipeline {
    /// Assemble a pipeline, failing if the three parts disagree on features
    /// or the threshold lies outside [0, 1].
    pub fn new(
        extractor: Box<dyn FeatureExtractor>,
        scaler: Scaler,
        model: Box<dyn Classifier>,
        threshold: f64,
    ) -> Result<Self> {
        let threshold = validate_threshold(threshold)?;
        let column_order = column_order(extractor.feature_names(), &scaler, model.as_ref())?;
        Ok(Self {
            extractor,
            scaler,
            model,
            column_order,
            threshold,
        })
    }

    /// Load both artifacts named by the config and assemble the pipeline.
    pub fn load(config: &Config, extractor: Box<dyn FeatureExtractor>) -> Result<Self> {
        let scaler = scaling::load_scaler(&config.scaler_path)
            .with_context(|| format!("Failed to load scaler from {}", config.scaler_path.display()))?;

        let model = load_classifier(
            &config.model_path,
            config.model_backend,
            &config.onnx_names,
            Some(scaler.width()),
        )
        .with_context(|| format!("Failed to load model from {}", config.model_path.display()))?;

        info!(
            backend = config.model_backend.as_str(),
            features = scaler.width(),
            threshold = config.threshold,
            "Loaded model and scaler"
        );

        Self::new(extractor, scaler, model, config.threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn extractor(&self) -> &dyn FeatureExtractor {
        self.extractor.as_ref()
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    /// Score a single URL. Deterministic for a given pipeline.
    pub fn score(&self, url: &str) -> Result<f64> {
        let features = self.extractor.extract(url);
        let values = features.values();
        if values.len() != self.extractor.feature_names().len() {
            anyhow::bail!(
                "Extractor returned {} features for {url:?}, declared {}",
                values.len(),
                self.extractor.feature_names().len()
            );
        }

        let row: Vec<f64> = self.column_order.iter().map(|&i| values[i]).collect();
        let scaled = self.scaler.transform(&row)?;
        let score = self.model.predict(&scaled)?;

        if !score.is_finite() {
            anyhow::bail!("Model produced a non-finite score ({score}) for {url:?}");
        }
        Ok(score)
    }

    /// Classify a single URL.
    pub fn classify(&self, url: &str) -> Result<Classification> {
        let score = self.score(url)?;
        let label = Label::from_score(score, self.threshold);
        debug!(url, score, label = label.as_str(), "Classified URL");

        Ok(Classification {
            url: url.to_string(),
            score,
            label,
        })
    }
}
