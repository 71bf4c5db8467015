// Classifier trait — the swap-ready abstraction over model backends.
//
// The pipeline hands a scaled row to whatever implements this trait. The
// gradient-boosted tree backend is the default; ONNX exports work too.

use anyhow::Result;

/// A trained classifier producing a phishing-likelihood score.
pub trait Classifier: Send + Sync {
    /// Score one scaled feature row. Higher means more likely phishing.
    fn predict(&self, row: &[f64]) -> Result<f64>;

    /// Number of input features the model expects, if the artifact says.
    fn expected_features(&self) -> Option<usize>;

    /// Feature names the model was trained with, if the artifact records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// One-line human description for `inspect`.
    fn describe(&self) -> String;
}
