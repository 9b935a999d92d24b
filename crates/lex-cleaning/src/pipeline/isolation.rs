//! Isolation forest scoring.
//!
//! Trees are grown on random subsamples; points that are isolated after few
//! splits get short average path lengths and therefore high scores. Each
//! tree draws from its own RNG seeded from `(seed, tree index)` and trees are
//! combined in index order, so scores do not depend on how rayon schedules
//! the work.

use crate::config::PipelineConfig;
use polars::prelude::{NamedFrom, QuantileMethod, Series};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Average path length of an unsuccessful search in a binary search tree
/// holding `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Deterministic mixing of the forest seed with a tree index.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length(&self, row: &[f64], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] < *threshold {
                    left.path_length(row, depth + 1)
                } else {
                    right.path_length(row, depth + 1)
                }
            }
        }
    }
}

/// Forest parameters.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub seed: u64,
}

impl IsolationForest {
    pub fn new(n_estimators: usize, max_samples: usize, seed: u64) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            max_samples: max_samples.max(2),
            seed,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.n_estimators, config.max_samples, config.random_seed)
    }

    /// Fit on `rows` (row-major, equal widths) and return the anomaly score
    /// of every row, in `(0, 1]`. Fewer than two rows yield all zeros.
    pub fn score_samples(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let n = rows.len();
        if n < 2 {
            return vec![0.0; n];
        }

        let sample_size = self.max_samples.min(n);
        let depth_limit = (sample_size as f64).log2().ceil() as usize;

        let trees: Vec<Node> = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(splitmix64(self.seed ^ i as u64));
                let sample = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
                grow(rows, sample, 0, depth_limit, &mut rng)
            })
            .collect();

        let normalizer = average_path_length(sample_size);
        rows.par_iter()
            .map(|row| {
                let total: f64 = trees.iter().map(|t| t.path_length(row, 0)).sum();
                let mean = total / trees.len() as f64;
                2f64.powf(-mean / normalizer)
            })
            .collect()
    }

    /// Flag rows whose score is strictly above the `1 - contamination`
    /// quantile of all scores.
    pub fn flag_outliers(&self, rows: &[Vec<f64>], contamination: f64) -> (Vec<bool>, Vec<f64>) {
        let scores = self.score_samples(rows);
        let Some(cutoff) = score_cutoff(&scores, 1.0 - contamination) else {
            return (Vec::new(), scores);
        };
        let flags = if rows.len() < 2 {
            vec![false; rows.len()]
        } else {
            scores.iter().map(|s| *s > cutoff).collect()
        };
        (flags, scores)
    }
}

/// Linearly interpolated `quantile` of the scores; `None` when there are none.
fn score_cutoff(scores: &[f64], quantile: f64) -> Option<f64> {
    Series::new("score".into(), scores)
        .quantile_reduce(quantile.clamp(0.0, 1.0), QuantileMethod::Linear)
        .ok()?
        .value()
        .extract::<f64>()
}

fn grow(rows: &[Vec<f64>], idx: Vec<usize>, depth: usize, limit: usize, rng: &mut StdRng) -> Node {
    if depth >= limit || idx.len() <= 1 {
        return Node::Leaf { size: idx.len() };
    }

    let width = rows[idx[0]].len();
    let candidates: Vec<(usize, f64, f64)> = (0..width)
        .filter_map(|f| {
            let (lo, hi) = idx.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                (lo.min(rows[r][f]), hi.max(rows[r][f]))
            });
            (hi > lo).then_some((f, lo, hi))
        })
        .collect();
    if candidates.is_empty() {
        return Node::Leaf { size: idx.len() };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) =
        idx.into_iter().partition(|&r| rows[r][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(rows, left, depth + 1, limit, rng)),
        right: Box::new(grow(rows, right, depth + 1, limit, rng)),
    }
}
