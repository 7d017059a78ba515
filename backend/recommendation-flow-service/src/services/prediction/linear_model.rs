use super::PredictionModel;
use crate::error::{PipelineError, Result};
use crate::models::{ContentId, Prediction, PredictionScore, TeamName, UpstreamScores, UserId};
use crate::services::features::{Feature, FeatureMatrix, FEATURE_WIDTH};
use crate::utils::{sigmoid, Seed};
use anyhow::Context;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Trained coefficients, indexed by feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModelWeights {
    pub feature_weights: Vec<f32>,
    pub upstream_weight: f64,
}

impl Default for LinearModelWeights {
    fn default() -> Self {
        let mut feature_weights = vec![0.0; FEATURE_WIDTH];
        feature_weights[Feature::LogLikes as usize] = 0.6;
        feature_weights[Feature::LogDislikes as usize] = -0.8;
        feature_weights[Feature::LikeRatio as usize] = 1.2;
        feature_weights[Feature::Seen as usize] = -1.5;
        feature_weights[Feature::AuthorAffinity as usize] = 0.7;
        feature_weights[Feature::AspectRatio as usize] = 0.0;
        feature_weights[Feature::PromptLength as usize] = 0.05;
        feature_weights[Feature::Bias as usize] = -0.8;

        Self {
            feature_weights,
            upstream_weight: 2.0,
        }
    }
}

impl LinearModelWeights {
    /// Load weights exported by the offline trainer.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model weights from {}", path.display()))?;
        let weights: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model weights in {}", path.display()))?;

        if weights.feature_weights.len() != FEATURE_WIDTH {
            anyhow::bail!(
                "Expected {} feature weights, got {}",
                FEATURE_WIDTH,
                weights.feature_weights.len()
            );
        }

        info!(path = %path.display(), "Loaded linear model weights");
        Ok(weights)
    }
}

/// Logistic scorer: `sigmoid(w·x + w_up·upstream)`.
///
/// Without a feature matrix only the upstream term contributes.
pub struct LinearModel {
    weights: Arc<LinearModelWeights>,
}

impl LinearModel {
    pub fn new(weights: Arc<LinearModelWeights>) -> Self {
        Self { weights }
    }

    fn feature_logits(&self, candidates: &[ContentId], features: &FeatureMatrix) -> Result<Array1<f32>> {
        if features.width() != FEATURE_WIDTH || self.weights.feature_weights.len() != FEATURE_WIDTH {
            return Err(PipelineError::InvalidInput(format!(
                "Expected {} features, got {}",
                FEATURE_WIDTH,
                features.width()
            )));
        }
        if features.len() != candidates.len() {
            return Err(PipelineError::InvalidInput(format!(
                "Feature matrix has {} rows for {} candidates",
                features.len(),
                candidates.len()
            )));
        }

        let weights = Array1::from_vec(self.weights.feature_weights.clone());
        Ok(features.values().dot(&weights))
    }
}

impl PredictionModel for LinearModel {
    fn name(&self) -> &'static str {
        "linear_model"
    }

    fn predict_probabilities(
        &self,
        team: TeamName,
        candidates: &[ContentId],
        user_id: UserId,
        _seed: Seed,
        scores: &UpstreamScores,
        features: Option<&FeatureMatrix>,
    ) -> Result<Prediction> {
        let logits = features
            .map(|matrix| self.feature_logits(candidates, matrix))
            .transpose()?;

        let mut prediction = Prediction::with_capacity(candidates.len());
        for (row, id) in candidates.iter().enumerate() {
            let upstream = scores.get(id).copied().unwrap_or(0.0);
            let feature_term = logits.as_ref().map_or(0.0, |l| l[row] as f64);

            prediction.entry(*id).or_insert_with(|| PredictionScore {
                score: sigmoid(feature_term + self.weights.upstream_weight * upstream),
                upstream_score: upstream,
            });
        }

        debug!(
            team = team.as_str(),
            user_id,
            predicted = prediction.len(),
            with_features = features.is_some(),
            "Linear predictions computed"
        );
        Ok(prediction)
    }
}
