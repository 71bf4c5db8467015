// Composition tests — verifying that extractor, scaler, model and output
// chain together correctly.
//
// Most tests assemble a pipeline from hand-built parts so expected scores
// can be computed by hand. The shipped artifacts under models/ are used for
// the end-to-end demo run.

use std::path::PathBuf;

use anyhow::Result;
use phishscan::artifacts::ArtifactError;
use phishscan::config::{Config, DEFAULT_THRESHOLD};
use phishscan::features::lexical::LexicalFeatureExtractor;
use phishscan::features::traits::{FeatureExtractor, FeatureVector};
use phishscan::model::gbdt::GbdtModel;
use phishscan::model::onnx::TensorNames;
use phishscan::model::traits::Classifier;
use phishscan::model::ModelBackend;
use phishscan::output::terminal::{banner, marker, write_report};
use phishscan::output::DEMO_URLS;
use phishscan::pipeline::{Label, Pipeline};
use phishscan::scaling::Scaler;

// ============================================================
// Test doubles
// ============================================================

/// Extractor with two features: URL length and a "has digit" flag.
struct TwoFeatureExtractor;

impl FeatureExtractor for TwoFeatureExtractor {
    fn feature_names(&self) -> &[&'static str] {
        &["length", "has_digit"]
    }

    fn extract(&self, url: &str) -> FeatureVector {
        let has_digit = url.chars().any(|c| c.is_ascii_digit());
        FeatureVector::new(vec![
            ("length", url.len() as f64),
            ("has_digit", if has_digit { 1.0 } else { 0.0 }),
        ])
    }
}

/// Model that returns a fixed score and records nothing.
struct ConstantModel(f64);

impl Classifier for ConstantModel {
    fn predict(&self, _row: &[f64]) -> Result<f64> {
        Ok(self.0)
    }

    fn expected_features(&self) -> Option<usize> {
        None
    }

    fn describe(&self) -> String {
        format!("constant {}", self.0)
    }
}

/// Model that returns the first scaled feature as its score.
struct FirstColumnModel;

impl Classifier for FirstColumnModel {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        Ok(row[0])
    }

    fn expected_features(&self) -> Option<usize> {
        Some(2)
    }

    fn describe(&self) -> String {
        "first column".to_string()
    }
}

fn names(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|s| s.to_string()).collect())
}

fn shipped_config() -> Config {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    Config {
        model_path: root.join("models/lightgbm_url_model.json"),
        scaler_path: root.join("models/scaler.json"),
        model_backend: ModelBackend::Gbdt,
        onnx_names: TensorNames::default(),
        threshold: DEFAULT_THRESHOLD,
    }
}

// ============================================================
// Pipeline with hand-built parts
// ============================================================

#[test]
fn scaled_features_reach_the_model() {
    // (length - 10) / 10 -> "http://a.b" (10 chars) scores 0.0
    let scaler = Scaler::standard(vec![10.0, 0.0], vec![10.0, 1.0], None).unwrap();
    let pipeline = Pipeline::new(
        Box::new(TwoFeatureExtractor),
        scaler,
        Box::new(FirstColumnModel),
        0.5,
    )
    .unwrap();

    assert!((pipeline.score("http://a.b").unwrap() - 0.0).abs() < 1e-12);
    assert!((pipeline.score("http://abcdefghij.b").unwrap() - 0.9).abs() < 1e-12);
}

#[test]
fn named_scaler_reorders_columns() {
    // Scaler fitted with has_digit first; the model reads column 0
    let scaler = Scaler::standard(
        vec![0.0, 0.0],
        vec![1.0, 1.0],
        names(&["has_digit", "length"]),
    )
    .unwrap();
    let pipeline = Pipeline::new(
        Box::new(TwoFeatureExtractor),
        scaler,
        Box::new(FirstColumnModel),
        0.5,
    )
    .unwrap();

    assert_eq!(pipeline.score("http://a1.b").unwrap(), 1.0);
    assert_eq!(pipeline.score("http://a.b").unwrap(), 0.0);
}

#[test]
fn scaler_name_missing_from_extractor_is_fatal() {
    let scaler = Scaler::standard(
        vec![0.0, 0.0],
        vec![1.0, 1.0],
        names(&["length", "num_dots"]),
    )
    .unwrap();
    let err = Pipeline::new(
        Box::new(TwoFeatureExtractor),
        scaler,
        Box::new(ConstantModel(0.1)),
        0.5,
    )
    .err()
    .unwrap();
    assert!(err.to_string().contains("num_dots"), "got: {err}");
}

#[test]
fn unnamed_scaler_width_mismatch_is_fatal() {
    let scaler = Scaler::standard(vec![0.0; 3], vec![1.0; 3], None).unwrap();
    let result = Pipeline::new(
        Box::new(TwoFeatureExtractor),
        scaler,
        Box::new(ConstantModel(0.1)),
        0.5,
    );
    assert!(result.is_err());
}

#[test]
fn model_width_mismatch_is_fatal() {
    let json = r#"{"objective": "binary", "max_feature_idx": 4,
                   "tree_info": [{"tree_structure": {"leaf_value": 0.0}}]}"#;
    let model = GbdtModel::from_json(json).unwrap();
    let scaler = Scaler::standard(vec![0.0; 2], vec![1.0; 2], None).unwrap();
    let err = Pipeline::new(Box::new(TwoFeatureExtractor), scaler, Box::new(model), 0.5)
        .err()
        .unwrap();
    assert!(err.to_string().contains("model expects 5"), "got: {err}");
}

#[test]
fn score_at_threshold_is_benign() {
    let scaler = Scaler::standard(vec![0.0; 2], vec![1.0; 2], None).unwrap();
    let pipeline = Pipeline::new(
        Box::new(TwoFeatureExtractor),
        scaler,
        Box::new(ConstantModel(0.5)),
        0.5,
    )
    .unwrap();

    let result = pipeline.classify("http://example.com").unwrap();
    assert_eq!(result.score, 0.5);
    assert_eq!(result.label, Label::Benign);
}

#[test]
fn out_of_range_threshold_is_rejected() {
    for threshold in [f64::NAN, -0.1, 1.5] {
        let scaler = Scaler::standard(vec![0.0; 2], vec![1.0; 2], None).unwrap();
        let result = Pipeline::new(
            Box::new(TwoFeatureExtractor),
            scaler,
            Box::new(ConstantModel(0.9)),
            threshold,
        );
        assert!(result.is_err(), "threshold {threshold} should be rejected");
    }
}

#[test]
fn non_finite_score_is_error() {
    let scaler = Scaler::standard(vec![0.0; 2], vec![1.0; 2], None).unwrap();
    let pipeline = Pipeline::new(
        Box::new(TwoFeatureExtractor),
        scaler,
        Box::new(ConstantModel(f64::NAN)),
        0.5,
    )
    .unwrap();
    assert!(pipeline.classify("http://example.com").is_err());
}

// ============================================================
// Shipped artifacts, end to end
// ============================================================

#[test]
fn demo_report_has_one_line_per_url_in_order() {
    let pipeline = Pipeline::load(&shipped_config(), Box::new(LexicalFeatureExtractor)).unwrap();

    let mut out = Vec::new();
    let results = write_report(&mut out, &pipeline, "Testing Multiple URLs", &DEMO_URLS, false).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    // banner, title, banner, six results, banner
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], banner());
    assert_eq!(lines[1], "Testing Multiple URLs");
    assert_eq!(lines[2], banner());
    assert_eq!(lines[9], banner());

    assert_eq!(results.len(), DEMO_URLS.len());
    for (i, url) in DEMO_URLS.iter().enumerate() {
        let line = lines[3 + i];
        assert!(line.ends_with(&format!(" | {url}")), "Line {i} out of order: {line}");
        assert_eq!(results[i].url, *url);
    }
}

#[test]
fn demo_labels_agree_with_scores() {
    let pipeline = Pipeline::load(&shipped_config(), Box::new(LexicalFeatureExtractor)).unwrap();

    for url in DEMO_URLS {
        let result = pipeline.classify(url).unwrap();
        assert_eq!(result.label == Label::Phishing, result.score > 0.5, "{url}");
        assert!((0.0..=1.0).contains(&result.score));
    }
}

#[test]
fn demo_expected_labels() {
    let pipeline = Pipeline::load(&shipped_config(), Box::new(LexicalFeatureExtractor)).unwrap();

    let mut out = Vec::new();
    write_report(&mut out, &pipeline, "Testing Multiple URLs", &DEMO_URLS, false).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().skip(3).take(6).collect();

    for line in &lines[..4] {
        assert!(line.starts_with(marker(Label::Benign)), "{line}");
        assert!(line.contains("Score: 0.1751"), "{line}");
    }
    assert!(lines[4].starts_with(marker(Label::Phishing)));
    assert!(lines[4].contains("Score: 0.7006"), "{}", lines[4]);
    assert!(lines[5].starts_with(marker(Label::Phishing)));
    assert!(lines[5].contains("Score: 0.8249"), "{}", lines[5]);
}

#[test]
fn classification_is_deterministic() {
    let pipeline = Pipeline::load(&shipped_config(), Box::new(LexicalFeatureExtractor)).unwrap();
    for url in DEMO_URLS {
        let a = pipeline.classify(url).unwrap();
        let b = pipeline.classify(url).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn missing_artifact_fails_before_any_output() {
    let mut config = shipped_config();
    config.scaler_path = std::env::temp_dir().join("phishscan-test-moved-scaler.json");

    assert!(config.require_artifacts().is_err());

    let err = Pipeline::load(&config, Box::new(LexicalFeatureExtractor))
        .err()
        .unwrap();
    let artifact_err = err
        .downcast_ref::<ArtifactError>()
        .expect("root cause should be an ArtifactError");
    assert!(matches!(artifact_err, ArtifactError::Missing(_)));
}

#[test]
fn missing_model_fails_to_load() {
    let mut config = shipped_config();
    config.model_path = std::env::temp_dir().join("phishscan-test-moved-model.json");

    let err = Pipeline::load(&config, Box::new(LexicalFeatureExtractor))
        .err()
        .unwrap();
    assert!(err.to_string().contains("Failed to load model"), "got: {err}");
}
