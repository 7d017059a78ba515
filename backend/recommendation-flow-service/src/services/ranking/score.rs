use super::{order_by_score, predicted_score, Ranker};
use crate::models::{ContentId, Prediction, RankedResult, RequestConfig, TeamName, UserId};
use crate::services::features::FeatureMatrix;
use crate::utils::Seed;
use tracing::debug;

pub struct ScoreRanker;

impl Ranker for ScoreRanker {
    fn name(&self) -> &'static str {
        "score_ranker"
    }

    fn rank_ids(
        &self,
        team: TeamName,
        user_id: UserId,
        candidates: &[ContentId],
        limit: usize,
        predictions: &Prediction,
        _seed: Seed,
        config: &RequestConfig,
        _features: Option<&FeatureMatrix>,
    ) -> RankedResult {
        let scored = candidates
            .iter()
            .map(|id| (*id, predicted_score(predictions, *id)))
            .collect();
        let ranked = order_by_score(scored, limit, config.inverse_ranker);

        debug!(team = team.as_str(), user_id, ranked = ranked.len(), "Candidates ranked by score");
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PredictionScore;

    fn predictions(scores: &[(ContentId, f64)]) -> Prediction {
        scores
            .iter()
            .map(|(id, score)| {
                (
                    *id,
                    PredictionScore {
                        score: *score,
                        upstream_score: 0.0,
                    },
                )
            })
            .collect()
    }

    fn rank(candidates: &[ContentId], limit: usize, config: &RequestConfig) -> RankedResult {
        let predictions = predictions(&[(1, 0.2), (2, 0.8), (3, 0.5)]);
        ScoreRanker.rank_ids(
            TeamName::Random,
            0,
            candidates,
            limit,
            &predictions,
            Seed::normalize(0.5),
            config,
            None,
        )
    }

    #[test]
    fn test_highest_score_first() {
        assert_eq!(rank(&[1, 2, 3], 10, &RequestConfig::default()), vec![2, 3, 1]);
    }

    #[test]
    fn test_inverse_ranker_flips_order() {
        let config = RequestConfig {
            inverse_ranker: true,
            ..RequestConfig::default()
        };
        assert_eq!(rank(&[1, 2, 3], 10, &config), vec![1, 3, 2]);
    }

    #[test]
    fn test_missing_prediction_scores_zero() {
        assert_eq!(rank(&[4, 1, 2], 10, &RequestConfig::default()), vec![2, 1, 4]);
    }

    #[test]
    fn test_limit_bounds_output() {
        assert_eq!(rank(&[1, 2, 3], 1, &RequestConfig::default()), vec![2]);
        assert!(rank(&[], 5, &RequestConfig::default()).is_empty());
    }
}
