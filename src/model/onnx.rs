// ONNX classifier backend.
//
// For models exported with onnxmltools/skl2onnx instead of dumped as
// LightGBM JSON. The exported graph takes a float tensor `[1, n]` and emits
// class probabilities; we read the positive-class column.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

use super::traits::Classifier;
use crate::artifacts::ArtifactError;

/// Input name used by onnxmltools/skl2onnx exports.
pub const DEFAULT_INPUT_NAME: &str = "float_input";

/// Probability output name when ZipMap is disabled at export time.
pub const DEFAULT_OUTPUT_NAME: &str = "probabilities";

/// Graph tensor names to feed and read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorNames {
    pub input: String,
    pub output: String,
}

impl Default for TensorNames {
    fn default() -> Self {
        Self {
            input: DEFAULT_INPUT_NAME.to_string(),
            output: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

/// ONNX Runtime session wrapped for the Classifier trait.
pub struct OnnxClassifier {
    // ort::Session::run takes &mut self
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    num_features: Option<usize>,
}

impl OnnxClassifier {
    /// Load an ONNX model from the given path.
    ///
    /// `num_features` is the expected row width when the caller knows it
    /// (usually the scaler width); ONNX graphs often leave it dynamic.
    pub fn load(
        model_path: &Path,
        names: &TensorNames,
        num_features: Option<usize>,
    ) -> std::result::Result<Self, ArtifactError> {
        if !model_path.exists() {
            return Err(ArtifactError::Missing(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")
            .and_then(|builder| {
                builder
                    .commit_from_file(model_path)
                    .context("Failed to load ONNX model")
            })
            .map_err(|e| ArtifactError::format(model_path, format!("{e:#}")))?;

        debug!(
            input = names.input.as_str(),
            output = names.output.as_str(),
            "Loaded ONNX classifier from {}",
            model_path.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name: names.input.clone(),
            output_name: names.output.clone(),
            num_features,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        check_width(self.num_features, row.len())?;

        let values: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let shape = [1i64, row.len() as i64];
        let input = Tensor::from_array((shape, values)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! { self.input_name.as_str() => input })
            .context("ONNX inference failed")?;

        let (_shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .with_context(|| format!("Failed to extract output tensor {:?}", self.output_name))?;

        positive_class_score(data)
    }

    fn expected_features(&self) -> Option<usize> {
        self.num_features
    }

    fn describe(&self) -> String {
        format!(
            "ONNX classifier: input {:?}, output {:?}",
            self.input_name, self.output_name
        )
    }
}

fn check_width(expected: Option<usize>, got: usize) -> Result<()> {
    if let Some(expected) = expected {
        if got != expected {
            anyhow::bail!(
                "Feature shape mismatch: model expects {} features, got {}",
                expected,
                got
            );
        }
    }
    Ok(())
}

/// Pick the positive-class probability out of a single-row output.
///
/// `[p0, p1]` yields p1; a lone value is taken as the score itself.
fn positive_class_score(data: &[f32]) -> Result<f64> {
    match data {
        [score] => Ok(*score as f64),
        [_, positive] => Ok(*positive as f64),
        other => anyhow::bail!(
            "Expected 1 or 2 output values for a binary classifier, got {}",
            other.len()
        ),
    }
}
