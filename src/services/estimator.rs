//! Bagged regression-tree ensemble (random forest) over the route features.
//!
//! Each tree is grown on a bootstrap sample, splitting on the threshold that
//! minimises the summed squared error of the two children. Predictions are the
//! mean of the tree outputs. The whole forest is plain data so it can be
//! written to the model store as-is.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{EtaError, EtaResult};
use crate::models::route::{FeatureVector, FEATURE_COUNT};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn predict(&self, x: &FeatureVector) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn fit(xs: &[FeatureVector], ys: &[f64], sample: Vec<usize>, params: &ForestParams) -> Self {
        let mut builder = TreeBuilder {
            xs,
            ys,
            params,
            nodes: Vec::new(),
        };
        builder.grow(sample, 0);
        Self {
            nodes: builder.nodes,
        }
    }
}

struct TreeBuilder<'a> {
    xs: &'a [FeatureVector],
    ys: &'a [f64],
    params: &'a ForestParams,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl<'a> TreeBuilder<'a> {
    /// Grows the subtree for `sample` and returns its node index.
    fn grow(&mut self, sample: Vec<usize>, depth: usize) -> usize {
        let value = mean(sample.iter().map(|&i| self.ys[i]));
        let at_depth_limit = self.params.max_depth.is_some_and(|max| depth >= max);

        let split = if at_depth_limit || sample.len() < self.params.min_samples_split.max(2) {
            None
        } else {
            self.best_split(&sample)
        };

        let Some(split) = split else {
            self.nodes.push(Node::Leaf { value });
            return self.nodes.len() - 1;
        };

        let (left_sample, right_sample): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.xs[i][split.feature] <= split.threshold);

        // Reserve the slot so children land after their parent.
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value });
        let left = self.grow(left_sample, depth + 1);
        let right = self.grow(right_sample, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, sample: &[usize]) -> Option<SplitCandidate> {
        let n = sample.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let total_sum: f64 = sample.iter().map(|&i| self.ys[i]).sum();
        let total_sq: f64 = sample.iter().map(|&i| self.ys[i] * self.ys[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;
        if parent_sse <= f64::EPSILON {
            return None;
        }

        let mut best: Option<SplitCandidate> = None;
        let mut order = sample.to_vec();

        for feature in 0..FEATURE_COUNT {
            order.sort_by(|&a, &b| self.xs[a][feature].total_cmp(&self.xs[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let y = self.ys[order[k]];
                left_sum += y;
                left_sq += y * y;

                let here = self.xs[order[k]][feature];
                let next = self.xs[order[k + 1]][feature];
                if here == next {
                    continue;
                }
                let left_n = k + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);

                if best.as_ref().map_or(true, |b| sse < b.sse) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        sse,
                    });
                }
            }
        }

        best.filter(|b| b.sse < parent_sse)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// The trained estimator: an average over bootstrapped regression trees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    params: ForestParams,
}

impl RandomForest {
    pub fn fit(xs: &[FeatureVector], ys: &[f64], params: &ForestParams) -> EtaResult<Self> {
        if xs.is_empty() {
            return Err(EtaError::Training("no training samples".to_string()));
        }
        if xs.len() != ys.len() {
            return Err(EtaError::Training(format!(
                "feature/target length mismatch: {} vs {}",
                xs.len(),
                ys.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(EtaError::Training("n_trees must be at least 1".to_string()));
        }
        if xs.iter().flatten().chain(ys).any(|v| !v.is_finite()) {
            return Err(EtaError::Training("non-finite value in training data".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = xs.len();
        let trees = (0..params.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(xs, ys, sample, params)
            })
            .collect();

        Ok(Self {
            trees,
            params: params.clone(),
        })
    }

    pub fn predict(&self, x: &FeatureVector) -> f64 {
        mean(self.trees.iter().map(|t| t.predict(x)))
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

/// Mean absolute error of `predict` over paired inputs and targets.
pub fn mean_absolute_error(predictions: &[f64], targets: &[f64]) -> f64 {
    mean(
        predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (p - t).abs()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params(n_trees: usize) -> ForestParams {
        ForestParams {
            n_trees,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_fit_rejects_empty() {
        let err = RandomForest::fit(&[], &[], &small_params(3)).unwrap_err();
        assert!(matches!(err, EtaError::Training(_)));
    }

    #[test]
    fn test_fit_rejects_nan() {
        let xs = vec![[1.0, 0.0, 0.0], [f64::NAN, 0.0, 0.0]];
        let err = RandomForest::fit(&xs, &[1.0, 2.0], &small_params(3)).unwrap_err();
        assert!(matches!(err, EtaError::Training(_)));
    }

    #[test]
    fn test_single_tree_learns_step() {
        let xs: Vec<FeatureVector> = (0..20).map(|i| [i as f64, 0.0, 0.0]).collect();
        let ys: Vec<f64> = (0..20).map(|i| if i < 10 { 5.0 } else { 50.0 }).collect();
        let tree = RegressionTree::fit(&xs, &ys, (0..20).collect(), &small_params(1));

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.predict(&[2.0, 0.0, 0.0]), 5.0);
        assert_eq!(tree.predict(&[9.4, 0.0, 0.0]), 5.0);
        assert_eq!(tree.predict(&[9.6, 0.0, 0.0]), 50.0);
    }

    #[test]
    fn test_max_depth_zero_is_mean() {
        let xs: Vec<FeatureVector> = (0..4).map(|i| [i as f64, 0.0, 0.0]).collect();
        let ys = vec![1.0, 2.0, 3.0, 6.0];
        let params = ForestParams {
            max_depth: Some(0),
            ..small_params(1)
        };
        let tree = RegressionTree::fit(&xs, &ys, (0..4).collect(), &params);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[10.0, 0.0, 0.0]), 3.0);
    }

    #[test]
    fn test_forest_is_deterministic_and_accurate() {
        let xs: Vec<FeatureVector> = (0..200)
            .map(|i| [(i % 50) as f64 * 0.5, (i % 24) as f64, (i % 7) as f64])
            .collect();
        let ys: Vec<f64> = xs.iter().map(|x| x[0] * 3.0 + 1.0).collect();

        let a = RandomForest::fit(&xs, &ys, &small_params(10)).unwrap();
        let b = RandomForest::fit(&xs, &ys, &small_params(10)).unwrap();
        assert_eq!(a, b);

        let preds: Vec<f64> = xs.iter().map(|x| a.predict(x)).collect();
        let mae = mean_absolute_error(&preds, &ys);
        assert!(mae < 1.0, "mae {}", mae);
    }

    #[test]
    fn test_mae() {
        assert_eq!(mean_absolute_error(&[1.0, 3.0], &[2.0, 1.0]), 1.5);
        assert_eq!(mean_absolute_error(&[], &[]), 0.0);
    }
}
