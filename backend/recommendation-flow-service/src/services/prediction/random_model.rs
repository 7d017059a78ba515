use super::PredictionModel;
use crate::error::Result;
use crate::models::{ContentId, Prediction, PredictionScore, TeamName, UpstreamScores, UserId};
use crate::services::features::FeatureMatrix;
use crate::utils::Seed;
use rand::Rng;
use tracing::debug;

/// Baseline model: one uniform [0, 1) draw per distinct candidate, taken in
/// candidate order from the seeded stream. Upstream scores are carried
/// through untouched in `upstream_score`.
pub struct RandomModel;

impl PredictionModel for RandomModel {
    fn name(&self) -> &'static str {
        "random_model"
    }

    fn predict_probabilities(
        &self,
        team: TeamName,
        candidates: &[ContentId],
        user_id: UserId,
        seed: Seed,
        scores: &UpstreamScores,
        _features: Option<&FeatureMatrix>,
    ) -> Result<Prediction> {
        let mut rng = seed.rng("model:random");
        let mut prediction = Prediction::with_capacity(candidates.len());

        for id in candidates {
            prediction.entry(*id).or_insert_with(|| PredictionScore {
                score: rng.gen::<f64>(),
                upstream_score: scores.get(id).copied().unwrap_or(0.0),
            });
        }

        debug!(team = team.as_str(), user_id, predicted = prediction.len(), "Random predictions drawn");
        Ok(prediction)
    }
}
