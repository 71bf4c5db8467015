use std::env;
use std::path::PathBuf;

use anyhow::Result;

use crate::model::onnx::{TensorNames, DEFAULT_INPUT_NAME, DEFAULT_OUTPUT_NAME};
use crate::model::ModelBackend;

/// Default classifier artifact, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "models/lightgbm_url_model.json";

/// Default scaler artifact, relative to the working directory.
pub const DEFAULT_SCALER_PATH: &str = "models/scaler.json";

/// Scores strictly above this are labeled phishing.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. CLI flags
/// are applied on top with the `with_*` methods.
#[derive(Debug, Clone)]
pub struct Config {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    /// Model format; inferred from the model path's extension when unset
    pub model_backend: ModelBackend,
    /// Tensor names for the ONNX backend; ignored by gbdt
    pub onnx_names: TensorNames,
    pub threshold: f64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every setting has a default; only a malformed value is an error.
    pub fn load() -> Result<Self> {
        let model_path = env::var("PHISHSCAN_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));
        let scaler_path = env::var("PHISHSCAN_SCALER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCALER_PATH));

        let model_backend = match env::var("PHISHSCAN_MODEL_BACKEND") {
            Ok(raw) => ModelBackend::parse(&raw).ok_or_else(|| {
                anyhow::anyhow!(
                    "PHISHSCAN_MODEL_BACKEND={raw:?} is not recognized. Use \"gbdt\" or \"onnx\"."
                )
            })?,
            Err(_) => ModelBackend::infer(&model_path),
        };

        let onnx_names = TensorNames {
            input: name_or_default(env::var("PHISHSCAN_ONNX_INPUT").ok(), DEFAULT_INPUT_NAME),
            output: name_or_default(env::var("PHISHSCAN_ONNX_OUTPUT").ok(), DEFAULT_OUTPUT_NAME),
        };

        let threshold = match env::var("PHISHSCAN_THRESHOLD") {
            Ok(raw) => parse_threshold(&raw)?,
            Err(_) => DEFAULT_THRESHOLD,
        };

        Ok(Self {
            model_path,
            scaler_path,
            model_backend,
            onnx_names,
            threshold,
        })
    }

    /// Override the model path; the backend is re-inferred from it.
    pub fn with_model_path(mut self, path: PathBuf) -> Self {
        self.model_backend = ModelBackend::infer(&path);
        self.model_path = path;
        self
    }

    pub fn with_scaler_path(mut self, path: PathBuf) -> Self {
        self.scaler_path = path;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        self.threshold = validate_threshold(threshold)?;
        Ok(self)
    }

    /// Check that both artifact files exist before trying to load them.
    pub fn require_artifacts(&self) -> Result<()> {
        for (what, path, var) in [
            ("Model", &self.model_path, "PHISHSCAN_MODEL_PATH"),
            ("Scaler", &self.scaler_path, "PHISHSCAN_SCALER_PATH"),
        ] {
            if !path.exists() {
                anyhow::bail!(
                    "{what} artifact not found: {}\n\
                     Set {var} or pass the path on the command line.",
                    path.display()
                );
            }
        }
        Ok(())
    }
}

/// A blank or unset name falls back to the default.
fn name_or_default(raw: Option<String>, default: &str) -> String {
    match raw {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Parse a threshold from text. Must be a finite number in [0, 1].
pub fn parse_threshold(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Threshold {raw:?} is not a number"))?;
    validate_threshold(value)
}

pub(crate) fn validate_threshold(value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        anyhow::bail!("Threshold must be between 0 and 1, got {value}");
    }
    Ok(value)
}
