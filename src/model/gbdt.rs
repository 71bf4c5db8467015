// Gradient-boosted tree ensemble loaded from a LightGBM JSON model dump.
//
// The artifact is what `Booster.dump_model()` writes: every tree as a nested
// JSON object. On load the nested form is flattened into one node arena per
// tree, so prediction is a tight loop over indices rather than pointer
// chasing through boxed children.
//
// Decision rules follow LightGBM's own: numeric splits send `x <= threshold`
// left, with the missing-value direction governed by `missing_type` and
// `default_left`; categorical splits send members of the category set left.

use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use super::traits::Classifier;
use crate::artifacts::{self, ArtifactError};

/// Values this close to zero count as zero for `missing_type: Zero`.
const ZERO_THRESHOLD: f64 = 1e-35;

// --- Dump format ---

#[derive(Debug, Deserialize)]
struct ModelDump {
    #[serde(default)]
    objective: String,
    #[serde(default = "default_num_class")]
    num_class: usize,
    #[serde(default)]
    max_feature_idx: Option<usize>,
    #[serde(default)]
    feature_names: Vec<String>,
    #[serde(default)]
    average_output: bool,
    tree_info: Vec<TreeInfo>,
}

fn default_num_class() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct TreeInfo {
    tree_structure: NodeDump,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NodeDump {
    Split {
        split_feature: usize,
        threshold: ThresholdDump,
        #[serde(default = "default_decision_type")]
        decision_type: String,
        #[serde(default)]
        default_left: bool,
        #[serde(default)]
        missing_type: Option<String>,
        left_child: Box<NodeDump>,
        right_child: Box<NodeDump>,
    },
    Leaf {
        leaf_value: f64,
    },
}

fn default_decision_type() -> String {
    "<=".to_string()
}

/// Numeric splits carry a number; categorical splits carry "1||4||7".
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ThresholdDump {
    Numeric(f64),
    Categories(String),
}

// --- Compiled form ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingType {
    None,
    Zero,
    NaN,
}

impl MissingType {
    fn parse(raw: Option<&str>) -> std::result::Result<Self, String> {
        match raw {
            None | Some("None") => Ok(MissingType::None),
            Some("Zero") => Ok(MissingType::Zero),
            Some("NaN") => Ok(MissingType::NaN),
            Some(other) => Err(format!("unknown missing_type {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Numeric {
        feature: usize,
        threshold: f64,
        missing: MissingType,
        default_left: bool,
        left: usize,
        right: usize,
    },
    Categorical {
        feature: usize,
        categories: Vec<i64>,
        missing: MissingType,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn compile(root: &NodeDump, num_features: usize) -> std::result::Result<Self, String> {
        let mut nodes = Vec::new();
        push_node(root, num_features, &mut nodes)?;
        Ok(Self { nodes })
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Numeric {
                    feature,
                    threshold,
                    missing,
                    default_left,
                    left,
                    right,
                } => {
                    idx = if numeric_goes_left(row[*feature], *threshold, *missing, *default_left) {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Categorical {
                    feature,
                    categories,
                    missing,
                    left,
                    right,
                } => {
                    idx = if categorical_goes_left(row[*feature], categories, *missing) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Append `dump` (and its subtree) to `nodes` in pre-order, returning its index.
fn push_node(
    dump: &NodeDump,
    num_features: usize,
    nodes: &mut Vec<Node>,
) -> std::result::Result<usize, String> {
    let idx = nodes.len();
    match dump {
        NodeDump::Leaf { leaf_value } => {
            nodes.push(Node::Leaf(*leaf_value));
        }
        NodeDump::Split {
            split_feature,
            threshold,
            decision_type,
            default_left,
            missing_type,
            left_child,
            right_child,
        } => {
            if *split_feature >= num_features {
                return Err(format!(
                    "split on feature {split_feature} but model has {num_features} features"
                ));
            }
            let missing = MissingType::parse(missing_type.as_deref())?;

            // Placeholder until the children's indices are known
            nodes.push(Node::Leaf(0.0));
            let left = push_node(left_child, num_features, nodes)?;
            let right = push_node(right_child, num_features, nodes)?;

            nodes[idx] = match (decision_type.as_str(), threshold) {
                ("<=", ThresholdDump::Numeric(t)) => Node::Numeric {
                    feature: *split_feature,
                    threshold: *t,
                    missing,
                    default_left: *default_left,
                    left,
                    right,
                },
                ("==", ThresholdDump::Categories(raw)) => Node::Categorical {
                    feature: *split_feature,
                    categories: parse_categories(raw)?,
                    missing,
                    left,
                    right,
                },
                ("==", ThresholdDump::Numeric(t)) if t.fract() == 0.0 => Node::Categorical {
                    feature: *split_feature,
                    categories: vec![*t as i64],
                    missing,
                    left,
                    right,
                },
                (other, _) => {
                    return Err(format!("unsupported split {other:?} with this threshold"));
                }
            };
        }
    }
    Ok(idx)
}

fn parse_categories(raw: &str) -> std::result::Result<Vec<i64>, String> {
    raw.split("||")
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("bad category {part:?} in threshold {raw:?}"))
        })
        .collect()
}

fn numeric_goes_left(value: f64, threshold: f64, missing: MissingType, default_left: bool) -> bool {
    let mut value = value;
    if value.is_nan() && missing != MissingType::NaN {
        value = 0.0;
    }
    if (missing == MissingType::Zero && value.abs() <= ZERO_THRESHOLD)
        || (missing == MissingType::NaN && value.is_nan())
    {
        return default_left;
    }
    value <= threshold
}

fn categorical_goes_left(value: f64, categories: &[i64], missing: MissingType) -> bool {
    let value = if value.is_nan() {
        if missing == MissingType::NaN {
            return false;
        }
        0.0
    } else {
        value
    };
    let category = value as i64;
    category >= 0 && categories.contains(&category)
}

/// How the summed raw score maps to the model output.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Link {
    Identity,
    Sigmoid(f64),
}

impl Link {
    /// Parse a LightGBM objective string such as "binary sigmoid:1".
    fn from_objective(objective: &str) -> std::result::Result<Self, String> {
        let mut tokens = objective.split_whitespace();
        let name = tokens.next().unwrap_or("");

        let sigmoid = tokens
            .find_map(|t| t.strip_prefix("sigmoid:"))
            .map(|k| {
                k.parse::<f64>()
                    .map_err(|_| format!("bad sigmoid parameter {k:?} in objective"))
            })
            .transpose()?
            .unwrap_or(1.0);

        match name {
            "binary" | "cross_entropy" | "xentropy" => Ok(Link::Sigmoid(sigmoid)),
            "" | "regression" | "regression_l1" | "regression_l2" | "l1" | "l2" | "huber"
            | "fair" | "quantile" | "mape" => Ok(Link::Identity),
            other => Err(format!("unsupported objective {other:?}")),
        }
    }

    fn apply(&self, raw: f64) -> f64 {
        match self {
            Link::Identity => raw,
            Link::Sigmoid(k) => sigmoid(k * raw),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// A compiled LightGBM tree ensemble.
#[derive(Debug, Clone)]
pub struct GbdtModel {
    trees: Vec<Tree>,
    num_features: usize,
    feature_names: Vec<String>,
    objective: String,
    link: Link,
    average_output: bool,
}

impl GbdtModel {
    /// Parse and compile a LightGBM JSON dump held in memory.
    pub fn from_json(json: &str) -> Result<Self> {
        let dump: ModelDump = serde_json::from_str(json)?;
        Self::compile(dump).map_err(anyhow::Error::msg)
    }

    fn compile(dump: ModelDump) -> std::result::Result<Self, String> {
        if dump.num_class != 1 {
            return Err(format!(
                "multiclass models are not supported (num_class = {})",
                dump.num_class
            ));
        }
        if dump.tree_info.is_empty() {
            return Err("model has no trees".to_string());
        }

        let link = Link::from_objective(&dump.objective)?;

        let num_features = match (dump.max_feature_idx, dump.feature_names.len()) {
            (Some(max_idx), 0) => max_idx + 1,
            (Some(max_idx), n) if n != max_idx + 1 => {
                return Err(format!(
                    "max_feature_idx {max_idx} disagrees with {n} feature names"
                ));
            }
            (_, 0) => return Err("model records neither max_feature_idx nor feature_names".to_string()),
            (_, n) => n,
        };

        let trees = dump
            .tree_info
            .iter()
            .enumerate()
            .map(|(i, info)| {
                Tree::compile(&info.tree_structure, num_features).map_err(|e| format!("tree {i}: {e}"))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            num_features,
            feature_names: dump.feature_names,
            objective: dump.objective,
            link,
            average_output: dump.average_output,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Sum of leaf values before the objective's link function.
    pub fn raw_score(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.num_features {
            anyhow::bail!(
                "Feature shape mismatch: model expects {} features, got {}",
                self.num_features,
                row.len()
            );
        }

        let sum: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        if self.average_output {
            Ok(sum / self.trees.len() as f64)
        } else {
            Ok(sum)
        }
    }
}

impl Classifier for GbdtModel {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        Ok(self.link.apply(self.raw_score(row)?))
    }

    fn expected_features(&self) -> Option<usize> {
        Some(self.num_features)
    }

    fn feature_names(&self) -> Option<&[String]> {
        if self.feature_names.is_empty() {
            None
        } else {
            Some(&self.feature_names)
        }
    }

    fn describe(&self) -> String {
        let objective = if self.objective.is_empty() {
            "unspecified"
        } else {
            self.objective.as_str()
        };
        format!(
            "LightGBM tree ensemble: {} trees, {} features, objective {}",
            self.trees.len(),
            self.num_features,
            objective
        )
    }
}

/// Load a LightGBM JSON dump from disk.
pub fn load_gbdt(path: &Path) -> std::result::Result<GbdtModel, ArtifactError> {
    let dump: ModelDump = artifacts::read_json(path)?;
    let model = GbdtModel::compile(dump).map_err(|reason| ArtifactError::format(path, reason))?;

    debug!(
        trees = model.num_trees(),
        features = model.num_features,
        objective = %model.objective,
        "Loaded tree ensemble from {}",
        path.display()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two stumps on feature 0 plus one categorical split on feature 1.
    const DUMP: &str = r#"{
        "name": "tree",
        "version": "v4",
        "num_class": 1,
        "max_feature_idx": 1,
        "objective": "binary sigmoid:1",
        "feature_names": ["f0", "f1"],
        "tree_info": [
            {"tree_index": 0, "tree_structure": {
                "split_index": 0, "split_feature": 0, "threshold": 0.5,
                "decision_type": "<=", "default_left": true, "missing_type": "NaN",
                "left_child": {"leaf_index": 0, "leaf_value": -1.0},
                "right_child": {"leaf_index": 1, "leaf_value": 1.0}
            }},
            {"tree_index": 1, "tree_structure": {
                "split_index": 0, "split_feature": 1, "threshold": "1||3",
                "decision_type": "==", "default_left": false, "missing_type": "None",
                "left_child": {"leaf_index": 0, "leaf_value": 0.5},
                "right_child": {"leaf_index": 1, "leaf_value": 0.0}
            }}
        ]
    }"#;

    #[test]
    fn test_raw_score_sums_trees() {
        let model = GbdtModel::from_json(DUMP).unwrap();
        assert_eq!(model.num_trees(), 2);
        assert!((model.raw_score(&[0.0, 3.0]).unwrap() - (-0.5)).abs() < 1e-12);
        assert!((model.raw_score(&[1.0, 2.0]).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_predict_applies_sigmoid() {
        let model = GbdtModel::from_json(DUMP).unwrap();
        let p = model.predict(&[1.0, 1.0]).unwrap();
        assert!((p - sigmoid(1.5)).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_is_inclusive_left() {
        let model = GbdtModel::from_json(DUMP).unwrap();
        // 0.5 <= 0.5 goes left (-1.0)
        assert!((model.raw_score(&[0.5, 0.0]).unwrap() - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_nan_follows_default_direction() {
        let model = GbdtModel::from_json(DUMP).unwrap();
        // missing_type NaN + default_left: NaN goes left
        assert!((model.raw_score(&[f64::NAN, 0.0]).unwrap() - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_numeric_missing_rules() {
        // missing None: NaN becomes 0.0, then compared normally
        assert!(numeric_goes_left(f64::NAN, 0.5, MissingType::None, false));
        assert!(!numeric_goes_left(f64::NAN, -0.5, MissingType::None, true));
        // missing Zero: zero takes the default direction
        assert!(!numeric_goes_left(0.0, 0.5, MissingType::Zero, false));
        assert!(numeric_goes_left(0.0, -0.5, MissingType::Zero, true));
    }

    #[test]
    fn test_categorical_rules() {
        assert!(categorical_goes_left(3.0, &[1, 3], MissingType::None));
        assert!(!categorical_goes_left(2.0, &[1, 3], MissingType::None));
        assert!(!categorical_goes_left(-1.0, &[1, 3], MissingType::None));
        assert!(!categorical_goes_left(f64::NAN, &[0], MissingType::NaN));
        assert!(categorical_goes_left(f64::NAN, &[0], MissingType::None));
    }

    #[test]
    fn test_wrong_row_width_is_error() {
        let model = GbdtModel::from_json(DUMP).unwrap();
        assert!(model.predict(&[1.0]).is_err());
    }

    #[test]
    fn test_link_from_objective() {
        assert_eq!(Link::from_objective("binary sigmoid:1").unwrap(), Link::Sigmoid(1.0));
        assert_eq!(Link::from_objective("binary sigmoid:2.5").unwrap(), Link::Sigmoid(2.5));
        assert_eq!(Link::from_objective("regression").unwrap(), Link::Identity);
        assert!(Link::from_objective("multiclass num_class:3").is_err());
    }

    #[test]
    fn test_single_leaf_tree() {
        let json = r#"{"objective": "regression", "max_feature_idx": 0,
                       "tree_info": [{"tree_structure": {"leaf_value": 0.25}}]}"#;
        let model = GbdtModel::from_json(json).unwrap();
        assert!((model.predict(&[42.0]).unwrap() - 0.25).abs() < 1e-12);
        assert!(Classifier::feature_names(&model).is_none());
    }

    #[test]
    fn test_average_output_divides_by_tree_count() {
        let json = r#"{"objective": "regression", "max_feature_idx": 0, "average_output": true,
                       "tree_info": [{"tree_structure": {"leaf_value": 1.0}},
                                     {"tree_structure": {"leaf_value": 0.0}}]}"#;
        let model = GbdtModel::from_json(json).unwrap();
        assert!((model.predict(&[0.0]).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_split_on_out_of_range_feature_rejected() {
        let json = r#"{"objective": "binary", "max_feature_idx": 0,
                       "tree_info": [{"tree_structure": {
                           "split_feature": 4, "threshold": 1.0, "decision_type": "<=",
                           "left_child": {"leaf_value": 0.0}, "right_child": {"leaf_value": 1.0}}}]}"#;
        let err = GbdtModel::from_json(json).unwrap_err();
        assert!(err.to_string().contains("tree 0"));
    }

    #[test]
    fn test_multiclass_rejected() {
        let json = r#"{"objective": "multiclass num_class:3", "num_class": 3, "max_feature_idx": 0,
                       "tree_info": [{"tree_structure": {"leaf_value": 1.0}}]}"#;
        assert!(GbdtModel::from_json(json).is_err());
    }
}
