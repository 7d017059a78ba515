/// Ranking Module
///
/// Final ordering of filtered candidates.
///
/// # Variants
/// - **ScoreRanker**: pure predicted-score sort
/// - **SeenDemotionRanker**: halves the score of already-seen candidates
///   before the same sort
///
/// Both sort stably, so equal scores keep concatenation order, and truncate
/// to `limit` only after the full ordering. `inverse_ranker` flips the sort
/// direction.
mod score;
mod seen_demotion;

pub use score::ScoreRanker;
pub use seen_demotion::{SeenDemotionRanker, SEEN_DEMOTION_FACTOR};

use crate::models::{ContentId, Prediction, RankedResult, RequestConfig, TeamName, UserId};
use crate::services::features::FeatureMatrix;
use crate::utils::Seed;
use std::cmp::Ordering;

pub trait Ranker: Send + Sync {
    fn name(&self) -> &'static str;

    #[allow(clippy::too_many_arguments)]
    fn rank_ids(
        &self,
        team: TeamName,
        user_id: UserId,
        candidates: &[ContentId],
        limit: usize,
        predictions: &Prediction,
        seed: Seed,
        config: &RequestConfig,
        features: Option<&FeatureMatrix>,
    ) -> RankedResult;
}

/// Predicted score, 0 for candidates the model did not cover.
pub(crate) fn predicted_score(predictions: &Prediction, id: ContentId) -> f64 {
    predictions.get(&id).map_or(0.0, |p| p.score)
}

/// Stable sort of `(id, score)` pairs, best first unless `inverse`, then
/// truncate to `limit`.
pub(crate) fn order_by_score(mut scored: Vec<(ContentId, f64)>, limit: usize, inverse: bool) -> RankedResult {
    // NaN compares equal so it never moves relative to its neighbours
    scored.sort_by(|a, b| {
        let ordering = b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal);
        if inverse {
            ordering.reverse()
        } else {
            ordering
        }
    });

    scored.truncate(limit);
    scored.into_iter().map(|(id, _)| id).collect()
}
