// Feature extractor trait and the vector type it produces.
//
// The pipeline only ever talks to this trait, so tests can drive it with
// hand-built vectors instead of depending on the real lexical extractor.

/// Named numeric features for one URL, in the extractor's fixed order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    features: Vec<(&'static str, f64)>,
}

impl FeatureVector {
    pub fn new(features: Vec<(&'static str, f64)>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Look up a feature value by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.iter().map(|(n, _)| *n)
    }

    /// Values in extractor order.
    pub fn values(&self) -> Vec<f64> {
        self.features.iter().map(|(_, v)| *v).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.features.iter().copied()
    }
}

/// Trait for turning a URL into model input features.
///
/// Implementations must be pure and total: the same URL always yields the
/// same vector, every URL yields a vector, and every vector carries exactly
/// the names returned by `feature_names`, in that order.
pub trait FeatureExtractor: Send + Sync {
    /// The fixed, ordered feature names this extractor produces.
    fn feature_names(&self) -> &[&'static str];

    /// Extract features from a single URL.
    fn extract(&self, url: &str) -> FeatureVector;
}
