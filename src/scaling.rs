// Feature scaling with parameters fitted at training time.
//
// The model was trained on scaled features, so inference must apply the
// exact same per-feature transform. Nothing is fitted here; the parameters
// come from the scaler artifact.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::{self, ArtifactError};

/// Scaling method the artifact was fitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingMethod {
    /// Standard scaling: (x - mean) / scale
    #[serde(rename = "standard")]
    Standard,
    /// MinMax scaling: x * scale + min (min already folds in the data minimum)
    #[serde(rename = "minmax")]
    MinMax,
}

impl ScalingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingMethod::Standard => "standard",
            ScalingMethod::MinMax => "minmax",
        }
    }
}

/// A fitted, immutable feature scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    kind: ScalingMethod,
    /// Feature names in fitted column order, when the artifact records them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mean: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    min: Vec<f64>,
    scale: Vec<f64>,
}

impl Scaler {
    pub fn standard(mean: Vec<f64>, scale: Vec<f64>, feature_names: Option<Vec<String>>) -> Result<Self> {
        let scaler = Self {
            kind: ScalingMethod::Standard,
            feature_names,
            mean,
            min: Vec::new(),
            scale,
        };
        scaler.validate().map_err(anyhow::Error::msg)?;
        Ok(scaler)
    }

    pub fn min_max(min: Vec<f64>, scale: Vec<f64>, feature_names: Option<Vec<String>>) -> Result<Self> {
        let scaler = Self {
            kind: ScalingMethod::MinMax,
            feature_names,
            mean: Vec::new(),
            min,
            scale,
        };
        scaler.validate().map_err(anyhow::Error::msg)?;
        Ok(scaler)
    }

    pub fn kind(&self) -> ScalingMethod {
        self.kind
    }

    /// Number of features the scaler was fitted on.
    pub fn width(&self) -> usize {
        self.scale.len()
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let width = self.scale.len();
        if width == 0 {
            return Err("scaler has no features".to_string());
        }

        let (offset_name, offsets) = match self.kind {
            ScalingMethod::Standard => ("mean", &self.mean),
            ScalingMethod::MinMax => ("min", &self.min),
        };
        if offsets.len() != width {
            return Err(format!(
                "{} scaler has {} {offset_name} values but {width} scale values",
                self.kind.as_str(),
                offsets.len()
            ));
        }

        if let Some(names) = &self.feature_names {
            if names.len() != width {
                return Err(format!(
                    "scaler has {} feature names but {width} scale values",
                    names.len()
                ));
            }
        }

        if self.scale.iter().chain(offsets.iter()).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".to_string());
        }

        Ok(())
    }

    /// Scale one row. The row must already be in fitted column order.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.width() {
            anyhow::bail!(
                "Feature shape mismatch: scaler expects {} features, got {}",
                self.width(),
                row.len()
            );
        }

        let scaled = match self.kind {
            ScalingMethod::Standard => row
                .iter()
                .zip(&self.mean)
                .zip(&self.scale)
                .map(|((x, mean), scale)| {
                    // Zero variance at fit time means the column was left unscaled
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    (x - mean) / scale
                })
                .collect(),
            ScalingMethod::MinMax => row
                .iter()
                .zip(&self.min)
                .zip(&self.scale)
                .map(|((x, min), scale)| x * scale + min)
                .collect(),
        };

        Ok(scaled)
    }
}

/// Load and validate a scaler artifact.
pub fn load_scaler(path: &Path) -> std::result::Result<Scaler, ArtifactError> {
    let scaler: Scaler = artifacts::read_json(path)?;
    scaler
        .validate()
        .map_err(|reason| ArtifactError::format(path, reason))?;

    debug!(
        kind = scaler.kind.as_str(),
        width = scaler.width(),
        named = scaler.feature_names.is_some(),
        "Loaded scaler from {}",
        path.display()
    );
    Ok(scaler)
}
