//! XGBoost gradient-boosted tree evaluator
//!
//! Reads the model document XGBoost writes with `save_model` (JSON or
//! UBJSON) and computes `predict_proba` for the positive class:
//!
//! - margin = logit(base_score) + sum of one leaf value per tree
//! - at a split, a missing value follows `default_left`, otherwise
//!   `x < split_condition` goes left
//! - probability = logistic(margin)
//!
//! Only `gbtree` boosters with a logistic objective and numerical splits
//! are accepted; anything else is rejected at load time rather than
//! producing silently wrong probabilities.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::core::scaler::ScaledFeatures;
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{FEATURE_COUNT, FEATURE_NAMES};
use crate::utils::ubjson;

// ============================================
// SERIALIZATION FORMATS
// ============================================

/// On-disk classifier serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ModelFormat {
    /// XGBoost JSON (version-stable)
    Json,
    /// XGBoost Universal Binary JSON
    Ubj,
    /// joblib/pickle, not readable outside Python
    LegacyPickle,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "ubj" => Some(Self::Ubj),
            "pkl" | "pickle" | "joblib" => Some(Self::LegacyPickle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Ubj => "ubj",
            Self::LegacyPickle => "pickle",
        }
    }
}

/// Read a model file into its generic document form
pub fn read_document(path: &Path, format: ModelFormat) -> AppResult<Value> {
    match format {
        ModelFormat::Json => {
            let bytes = std::fs::read(path)?;
            Ok(serde_json::from_slice(&bytes)?)
        }
        ModelFormat::Ubj => {
            let bytes = std::fs::read(path)?;
            ubjson::decode(&bytes)
        }
        ModelFormat::LegacyPickle => Err(AppError::unsupported_format(format!(
            "{} is a Python pickle; re-export it with XGBoost `save_model` to JSON or UBJ",
            path.display()
        ))),
    }
}

// ============================================
// DOCUMENT SCHEMA
// ============================================

#[derive(Debug, Deserialize)]
struct ModelDocument {
    learner: LearnerDoc,
    #[serde(default)]
    version: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct LearnerDoc {
    #[serde(default)]
    attributes: HashMap<String, Value>,
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: BoosterDoc,
    learner_model_param: LearnerModelParamDoc,
    objective: ObjectiveDoc,
}

#[derive(Debug, Deserialize)]
struct BoosterDoc {
    name: String,
    #[serde(default)]
    model: Option<GbTreeModelDoc>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModelDoc {
    #[serde(default)]
    gbtree_model_param: HashMap<String, Param>,
    trees: Vec<TreeDoc>,
    #[serde(default)]
    tree_info: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct TreeDoc {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParamDoc {
    base_score: Param,
    #[serde(default)]
    num_class: Option<Param>,
    num_feature: Param,
}

#[derive(Debug, Deserialize)]
struct ObjectiveDoc {
    name: String,
}

/// XGBoost writes most scalar params as strings, UBJ sometimes as numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Param {
    Number(f64),
    Text(String),
}

impl Param {
    /// Parses "5E-1", "[5E-1]" (XGBoost >= 2.1 vector form) or a number
    fn as_f64(&self, name: &str) -> AppResult<f64> {
        match self {
            Param::Number(n) => Ok(*n),
            Param::Text(s) => s
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .next()
                .and_then(|first| first.trim().parse::<f64>().ok())
                .ok_or_else(|| AppError::malformed(format!("Cannot parse {} = {:?}", name, s))),
        }
    }
}

/// default_left is bool in old JSON, 0/1 in JSON >= 1.6 and uint8 in UBJ
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

// ============================================
// EVALUATOR
// ============================================

const LEAF: i32 = -1;

#[derive(Debug, Clone, Copy)]
struct Node {
    left: i32,
    right: i32,
    feature: u32,
    /// Split threshold, or leaf value when `left == LEAF`
    value: f32,
    default_left: bool,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_doc(index: usize, doc: &TreeDoc) -> AppResult<Self> {
        let n = doc.left_children.len();
        let malformed = |msg: String| AppError::malformed(format!("tree {}: {}", index, msg));

        if n == 0 {
            return Err(malformed("no nodes".to_string()));
        }
        let lengths = [
            doc.right_children.len(),
            doc.split_indices.len(),
            doc.split_conditions.len(),
            doc.default_left.len(),
        ];
        if lengths.iter().any(|len| *len != n) {
            return Err(malformed(format!("node arrays disagree in length ({} vs {:?})", n, lengths)));
        }
        if doc.split_type.iter().any(|t| *t != 0) {
            return Err(AppError::unsupported_format(format!(
                "tree {}: categorical splits are not supported",
                index
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (doc.left_children[i], doc.right_children[i]);
            let is_leaf = left == LEAF as i64;

            if is_leaf {
                if right != LEAF as i64 {
                    return Err(malformed(format!("node {} has only one child", i)));
                }
            } else {
                // Children are always stored after their parent, which also
                // guarantees traversal terminates.
                for child in [left, right] {
                    if child <= i as i64 || child >= n as i64 {
                        return Err(malformed(format!("node {} has invalid child {}", i, child)));
                    }
                }
                let feature = doc.split_indices[i];
                if feature < 0 || feature >= FEATURE_COUNT as i64 {
                    return Err(malformed(format!("node {} splits on feature {}", i, feature)));
                }
            }

            nodes.push(Node {
                left: left as i32,
                right: right as i32,
                feature: if is_leaf { 0 } else { doc.split_indices[i] as u32 },
                value: doc.split_conditions[i] as f32,
                default_left: doc.default_left[i].is_set(),
            });
        }
        Ok(Self { nodes })
    }

    fn leaf_value(&self, x: &[f32; FEATURE_COUNT]) -> f32 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.left == LEAF {
                return node.value;
            }
            let fvalue = x[node.feature as usize];
            let go_left = if fvalue.is_nan() {
                node.default_left
            } else {
                fvalue < node.value
            };
            idx = if go_left { node.left } else { node.right } as usize;
        }
    }
}

/// Binary classifier backed by an XGBoost tree ensemble
#[derive(Debug, Clone)]
pub struct XgbClassifier {
    trees: Vec<Tree>,
    base_margin: f32,
    objective: String,
    version: String,
}

impl XgbClassifier {
    /// Validate and compile a model document
    pub fn from_document(document: Value) -> AppResult<Self> {
        let doc: ModelDocument = serde_json::from_value(document)?;
        let learner = doc.learner;

        let objective = learner.objective.name;
        if !matches!(objective.as_str(), "binary:logistic" | "reg:logistic") {
            return Err(AppError::unsupported_format(format!(
                "objective {} is not a logistic binary objective",
                objective
            )));
        }

        let num_feature = learner.learner_model_param.num_feature.as_f64("num_feature")?;
        if num_feature as usize != FEATURE_COUNT {
            return Err(AppError::malformed(format!(
                "model expects {} features, record has {}",
                num_feature, FEATURE_COUNT
            )));
        }
        let num_class = match &learner.learner_model_param.num_class {
            Some(p) => p.as_f64("num_class")? as usize,
            None => 0,
        };
        if num_class > 1 {
            return Err(AppError::unsupported_format(format!(
                "multi-class model ({} classes)",
                num_class
            )));
        }

        if !learner.feature_names.is_empty() && learner.feature_names != FEATURE_NAMES {
            return Err(AppError::feature_order_mismatch(format!(
                "model feature order {:?} does not match {:?}",
                learner.feature_names, FEATURE_NAMES
            )));
        }

        let base_score = learner.learner_model_param.base_score.as_f64("base_score")?;
        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(AppError::malformed(format!(
                "base_score {} is not a probability in (0, 1)",
                base_score
            )));
        }
        let base_margin = (base_score / (1.0 - base_score)).ln() as f32;

        let booster = learner.gradient_booster;
        if booster.name != "gbtree" {
            return Err(AppError::unsupported_format(format!(
                "booster {} is not supported",
                booster.name
            )));
        }
        let model = booster
            .model
            .ok_or_else(|| AppError::malformed("gbtree booster without model"))?;
        if model.tree_info.iter().any(|group| *group != 0) {
            return Err(AppError::malformed("binary model has trees outside output group 0"));
        }

        let mut trees = model
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| Tree::from_doc(i, t))
            .collect::<AppResult<Vec<_>>>()?;

        // sklearn's predict_proba stops at best_iteration when early
        // stopping recorded one
        if let Some(best) = learner.attributes.get("best_iteration").and_then(param_usize) {
            let per_round = model
                .gbtree_model_param
                .get("num_parallel_tree")
                .and_then(|p| p.as_f64("num_parallel_tree").ok())
                .map(|n| n.max(1.0) as usize)
                .unwrap_or(1);
            let keep = (best + 1).saturating_mul(per_round);
            if keep < trees.len() {
                debug!(best_iteration = best, kept = keep, total = trees.len(), "Truncating to best iteration");
                trees.truncate(keep);
            }
        }

        let version = doc
            .version
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(".");

        info!(
            trees = trees.len(),
            objective = %objective,
            xgboost_version = %version,
            "XGBoost model compiled"
        );

        Ok(Self {
            trees,
            base_margin,
            objective,
            version,
        })
    }

    /// Read, decode and compile a model file
    pub fn load(path: &Path, format: ModelFormat) -> AppResult<Self> {
        Self::from_document(read_document(path, format)?)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    /// XGBoost version that wrote the model, e.g. "2.0.3"
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Raw margin (log-odds)
    pub fn predict_margin(&self, features: &[f64; FEATURE_COUNT]) -> f32 {
        // XGBoost evaluates in single precision
        let x = features.map(|v| v as f32);
        self.trees
            .iter()
            .fold(self.base_margin, |acc, tree| acc + tree.leaf_value(&x))
    }

    /// P(positive class)
    pub fn predict_proba(&self, features: &ScaledFeatures) -> f64 {
        sigmoid(self.predict_margin(&features.0) as f64)
    }
}

fn param_usize(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        _ => None,
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}
