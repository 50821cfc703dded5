use serde::{Deserialize, Serialize};

/// How per-tree outputs are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Gradient boosting: leaves already carry the learning rate.
    #[default]
    Sum,
    /// Bagging / random forests.
    Mean,
}

/// A node of a regression tree. Node 0 is the root; a split sends a row to
/// `left` when `x[feature] < threshold` and to `right` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, features: &[f32]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if (features[*feature] as f64) < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(format!("node {index} has a non-finite leaf value"));
                }
                Node::Leaf { .. } => {}
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {index} splits on feature {feature} but the model has {n_features} features"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {index} has a non-finite threshold"));
                    }
                    // Children always come after their parent, so walking a tree terminates.
                    for child in [left, right] {
                        if *child <= index || *child >= self.nodes.len() {
                            return Err(format!("node {index} has an invalid child index {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// A serialized tree-ensemble regressor: the model artifact format.
///
/// ```json
/// {
///   "name": "xgb_model",
///   "n_features": 2048,
///   "base_score": 5.2,
///   "aggregation": "sum",
///   "trees": [
///     { "nodes": [
///       { "feature": 17, "threshold": 0.5, "left": 1, "right": 2 },
///       { "value": -0.1 },
///       { "value": 0.3 }
///     ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub name: String,
    pub n_features: usize,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub aggregation: Aggregation,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Deserialize and validate an artifact.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let model: TreeEnsemble = serde_json::from_str(json).map_err(|e| e.to_string())?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("n_features must be positive".to_string());
        }
        if self.trees.is_empty() {
            return Err("model has no trees".to_string());
        }
        if !self.base_score.is_finite() {
            return Err("base_score is not finite".to_string());
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|reason| format!("tree {index}: {reason}"))?;
        }
        Ok(())
    }

    /// Predict one row. The caller checks `features.len() == n_features`.
    pub fn predict_row(&self, features: &[f32]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict(features)).sum();
        let combined = match self.aggregation {
            Aggregation::Sum => total,
            Aggregation::Mean => total / self.trees.len() as f64,
        };
        self.base_score + combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, left: f64, right: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: left },
                Node::Leaf { value: right },
            ],
        }
    }

    fn ensemble(aggregation: Aggregation) -> TreeEnsemble {
        TreeEnsemble {
            name: "test".to_string(),
            n_features: 4,
            base_score: 5.0,
            aggregation,
            trees: vec![stump(0, -1.0, 1.0), stump(3, 0.0, 2.0)],
        }
    }

    #[test]
    fn test_predict_sum_and_mean() {
        let sum = ensemble(Aggregation::Sum);
        assert_eq!(sum.predict_row(&[0.0, 0.0, 0.0, 0.0]), 4.0);
        assert_eq!(sum.predict_row(&[1.0, 0.0, 0.0, 1.0]), 8.0);

        let mean = ensemble(Aggregation::Mean);
        assert_eq!(mean.predict_row(&[1.0, 0.0, 0.0, 1.0]), 6.5);
    }

    #[test]
    fn test_json_format() {
        let json = r#"{
            "name": "xgb_model",
            "n_features": 2,
            "base_score": 6.0,
            "trees": [
                { "nodes": [
                    { "feature": 1, "threshold": 0.5, "left": 1, "right": 2 },
                    { "value": -0.5 },
                    { "value": 0.25 }
                ] }
            ]
        }"#;
        let model = TreeEnsemble::from_json(json).unwrap();
        assert_eq!(model.aggregation, Aggregation::Sum);
        assert_eq!(model.predict_row(&[0.0, 1.0]), 6.25);

        let round_tripped = TreeEnsemble::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(round_tripped, model);
    }

    #[test]
    fn test_validation() {
        let mut model = ensemble(Aggregation::Sum);
        model.trees[0].nodes[0] = Node::Split {
            feature: 9,
            threshold: 0.5,
            left: 1,
            right: 2,
        };
        assert!(model.validate().unwrap_err().contains("feature 9"));

        let mut model = ensemble(Aggregation::Sum);
        model.trees[1].nodes[0] = Node::Split {
            feature: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
        };
        assert!(model.validate().unwrap_err().contains("invalid child"));

        let mut model = ensemble(Aggregation::Sum);
        model.trees.clear();
        assert!(model.validate().is_err());

        assert!(TreeEnsemble::from_json("not json").is_err());
        assert!(TreeEnsemble::from_json(r#"{"name":"x","n_features":0,"trees":[]}"#).is_err());
    }
}
