// Classifier backends — trait-based abstraction for swappable model formats.
//
// The Classifier trait defines the interface. GbdtModel evaluates a
// LightGBM JSON dump natively; OnnxClassifier runs an ONNX export through
// ONNX Runtime. The rest of the pipeline never knows which one it has.

pub mod gbdt;
pub mod onnx;
pub mod traits;

use std::path::Path;

use crate::artifacts::ArtifactError;
use traits::Classifier;

/// Which model artifact format to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackend {
    /// LightGBM `dump_model()` JSON, evaluated natively (default)
    Gbdt,
    /// ONNX export, evaluated with ONNX Runtime
    Onnx,
}

impl ModelBackend {
    /// Guess the backend from the artifact's file extension.
    pub fn infer(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => ModelBackend::Onnx,
            _ => ModelBackend::Gbdt,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gbdt" | "lightgbm" => Some(ModelBackend::Gbdt),
            "onnx" => Some(ModelBackend::Onnx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelBackend::Gbdt => "gbdt",
            ModelBackend::Onnx => "onnx",
        }
    }
}

/// Load the classifier artifact with the chosen backend.
///
/// `onnx_names` are only used by the ONNX backend. `num_features` is the row
/// width the caller will feed (the scaler width); backends that can't read it
/// from the artifact check against it instead.
pub fn load_classifier(
    path: &Path,
    backend: ModelBackend,
    onnx_names: &onnx::TensorNames,
    num_features: Option<usize>,
) -> Result<Box<dyn Classifier>, ArtifactError> {
    match backend {
        ModelBackend::Gbdt => Ok(Box::new(gbdt::load_gbdt(path)?)),
        ModelBackend::Onnx => Ok(Box::new(onnx::OnnxClassifier::load(
            path,
            onnx_names,
            num_features,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_extension() {
        assert_eq!(ModelBackend::infer(Path::new("m.onnx")), ModelBackend::Onnx);
        assert_eq!(ModelBackend::infer(Path::new("m.ONNX")), ModelBackend::Onnx);
        assert_eq!(ModelBackend::infer(Path::new("m.json")), ModelBackend::Gbdt);
        assert_eq!(ModelBackend::infer(Path::new("model")), ModelBackend::Gbdt);
    }

    #[test]
    fn test_parse_backend() {
        assert_eq!(ModelBackend::parse("LightGBM"), Some(ModelBackend::Gbdt));
        assert_eq!(ModelBackend::parse(" onnx "), Some(ModelBackend::Onnx));
        assert_eq!(ModelBackend::parse("xgboost"), None);
    }

    #[test]
    fn test_load_classifier_missing_file() {
        let path = std::env::temp_dir().join("phishscan-test-no-model.json");
        let err = load_classifier(&path, ModelBackend::Gbdt, &onnx::TensorNames::default(), None)
            .err()
            .unwrap();
        assert!(matches!(err, ArtifactError::Missing(_)));
    }
}
