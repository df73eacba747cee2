//! Phase classifier adapter contract, plus a concrete nearest-centroid
//! implementation.
//!
//! Grounded on `original_source/.../domain/ports/phase_classifier_port.py`
//! for the contract shape (classify/classify_batch/
//! classify_with_confidence/train/is_trained/save_model/load_model,
//! untrained ⇒ unknown/confidence 0) and
//! `infrastructure/ml/sklearn_phase_classifier.py` for the scaler +
//! trained-flag + feature-importance-metrics shape. Concrete ML model
//! training is out of scope for this crate, so the RandomForest the
//! original trains is replaced with a from-scratch standardized
//! nearest-class-centroid model — deterministic, dependency-free, and
//! sufficient to exercise the full adapter contract.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::phase::{GamePhase, PhaseFeatures, NUM_PHASE_FEATURES};
use crate::error::{PitchSenseError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 500;

type FeatureVec = [f64; NUM_PHASE_FEATURES];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    pub n_samples: usize,
    pub n_features: usize,
    pub feature_importances: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ModelState {
    scaler_mean: FeatureVec,
    scaler_std: FeatureVec,
    centroids: Vec<(GamePhase, FeatureVec)>,
}

/// Standardized-feature nearest-centroid phase classifier.
#[derive(Debug, Default)]
pub struct PhaseClassifierAdapter {
    state: Option<ModelState>,
}

impl PhaseClassifierAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    /// Untrained ⇒ `(Unknown, 0.0)`, matching the original adapter.
    pub fn classify_with_confidence(&self, features: &PhaseFeatures) -> (GamePhase, f64) {
        let Some(state) = &self.state else {
            return (GamePhase::Unknown, 0.0);
        };
        let scaled = scale(&features.to_vector(), &state.scaler_mean, &state.scaler_std);

        let mut weights: Vec<(GamePhase, f64)> = state
            .centroids
            .iter()
            .map(|(phase, centroid)| (*phase, (-squared_distance(&scaled, centroid)).exp()))
            .collect();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return (GamePhase::Unknown, 0.0);
        }
        for (_, w) in weights.iter_mut() {
            *w /= total;
        }
        weights
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap_or((GamePhase::Unknown, 0.0))
    }

    pub fn classify(&self, features: &PhaseFeatures) -> GamePhase {
        self.classify_with_confidence(features).0
    }

    /// Classifies in tunable batches; batching has no semantic effect
    /// here (no network/IO boundary), only a fixed default chunk size
    /// for interface parity with batched backends.
    pub fn classify_batch(&self, features_list: &[PhaseFeatures], batch_size: usize) -> Vec<GamePhase> {
        let batch_size = batch_size.max(1);
        features_list
            .chunks(batch_size)
            .flat_map(|chunk| chunk.iter().map(|f| self.classify(f)))
            .collect()
    }

    /// Fits per-class centroids on standardized features. Errors if
    /// either input is empty or their lengths disagree.
    pub fn train(&mut self, features: &[PhaseFeatures], labels: &[GamePhase]) -> Result<TrainingMetrics> {
        if features.is_empty() || labels.is_empty() {
            return Err(PitchSenseError::BadInput("cannot train on empty data".to_string()));
        }
        if features.len() != labels.len() {
            return Err(PitchSenseError::BadInput(format!(
                "feature/label count mismatch: {} vs {}",
                features.len(),
                labels.len()
            )));
        }

        let raw: Vec<FeatureVec> = features.iter().map(|f| f.to_vector()).collect();
        let (mean, std) = standardize_params(&raw);
        let scaled: Vec<FeatureVec> = raw.iter().map(|v| scale(v, &mean, &std)).collect();

        let mut sums: HashMap<GamePhase, (FeatureVec, u64)> = HashMap::new();
        for (v, &label) in scaled.iter().zip(labels.iter()) {
            let entry = sums.entry(label).or_insert(([0.0; NUM_PHASE_FEATURES], 0));
            for (s, &x) in entry.0.iter_mut().zip(v.iter()) {
                *s += x;
            }
            entry.1 += 1;
        }

        let centroids: Vec<(GamePhase, FeatureVec)> = sums
            .into_iter()
            .map(|(phase, (sum, count))| {
                let mut centroid = [0.0; NUM_PHASE_FEATURES];
                for (c, &s) in centroid.iter_mut().zip(sum.iter()) {
                    *c = s / count as f64;
                }
                (phase, centroid)
            })
            .collect();

        let state = ModelState { scaler_mean: mean, scaler_std: std, centroids };

        let correct = scaled
            .iter()
            .zip(labels.iter())
            .filter(|(v, &label)| {
                state
                    .centroids
                    .iter()
                    .min_by(|(_, a), (_, b)| squared_distance(v, a).partial_cmp(&squared_distance(v, b)).unwrap())
                    .map(|(phase, _)| *phase == label)
                    .unwrap_or(false)
            })
            .count();
        let accuracy = correct as f64 / features.len() as f64;

        let importances = feature_importances(&state.centroids);

        self.state = Some(state);

        Ok(TrainingMetrics {
            accuracy,
            n_samples: features.len(),
            n_features: NUM_PHASE_FEATURES,
            feature_importances: importances,
        })
    }

    pub fn save_model(&self, path: impl AsRef<Path>) -> Result<()> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| PitchSenseError::BadInput("cannot save untrained model".to_string()))?;
        let json = serde_json::to_string(state)
            .map_err(|e| PitchSenseError::internal(e.to_string(), "phase-classifier-save"))?;
        fs::write(path, json).map_err(|e| PitchSenseError::UpstreamUnavailable(e.to_string()))
    }

    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PitchSenseError::NotFound(format!("model not found: {}", path.display())));
        }
        let json = fs::read_to_string(path).map_err(|e| PitchSenseError::UpstreamUnavailable(e.to_string()))?;
        let state: ModelState =
            serde_json::from_str(&json).map_err(|e| PitchSenseError::internal(e.to_string(), "phase-classifier-load"))?;
        self.state = Some(state);
        Ok(())
    }
}

/// Spread of each class centroid's distance from the global feature
/// mean, normalized to sum to 1 — a cheap proxy for sklearn's
/// `feature_importances_` that needs no trained tree ensemble.
fn feature_importances(centroids: &[(GamePhase, FeatureVec)]) -> HashMap<String, f64> {
    let names = PhaseFeatures::feature_names();
    if centroids.len() < 2 {
        return names.iter().map(|n| (n.to_string(), 0.0)).collect();
    }

    let mut spread = [0.0; NUM_PHASE_FEATURES];
    for dim in 0..NUM_PHASE_FEATURES {
        let values: Vec<f64> = centroids.iter().map(|(_, c)| c[dim]).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        spread[dim] = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    }
    let total: f64 = spread.iter().sum();
    names
        .iter()
        .zip(spread.iter())
        .map(|(n, &s)| (n.to_string(), if total > 0.0 { s / total } else { 0.0 }))
        .collect()
}

fn standardize_params(values: &[FeatureVec]) -> (FeatureVec, FeatureVec) {
    let n = values.len() as f64;
    let mut mean = [0.0; NUM_PHASE_FEATURES];
    for v in values {
        for (m, &x) in mean.iter_mut().zip(v.iter()) {
            *m += x / n;
        }
    }
    let mut variance = [0.0; NUM_PHASE_FEATURES];
    for v in values {
        for (var, (&x, &m)) in variance.iter_mut().zip(v.iter().zip(mean.iter())) {
            *var += (x - m).powi(2) / n;
        }
    }
    let mut std = [1.0; NUM_PHASE_FEATURES];
    for (s, &var) in std.iter_mut().zip(variance.iter()) {
        let sd = var.sqrt();
        *s = if sd < 1e-9 { 1.0 } else { sd };
    }
    (mean, std)
}

fn scale(v: &FeatureVec, mean: &FeatureVec, std: &FeatureVec) -> FeatureVec {
    let mut out = [0.0; NUM_PHASE_FEATURES];
    for i in 0..NUM_PHASE_FEATURES {
        out[i] = (v[i] - mean[i]) / std[i];
    }
    out
}

fn squared_distance(a: &FeatureVec, b: &FeatureVec) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
