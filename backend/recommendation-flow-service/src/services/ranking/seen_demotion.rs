use super::{order_by_score, predicted_score, Ranker};
use crate::models::{ContentId, Prediction, RankedResult, RequestConfig, TeamName, UserId};
use crate::services::features::{Feature, FeatureMatrix};
use crate::utils::Seed;
use std::collections::HashMap;
use tracing::debug;

/// Multiplier applied to the score of content the user has already seen.
pub const SEEN_DEMOTION_FACTOR: f64 = 0.5;

/// Score sort that pushes already-seen content down.
///
/// The seen flag is read from the feature matrix; without one this behaves
/// like a plain score sort.
pub struct SeenDemotionRanker;

impl SeenDemotionRanker {
    fn seen_ids(features: &FeatureMatrix) -> HashMap<ContentId, bool> {
        features
            .ids()
            .iter()
            .enumerate()
            .map(|(row, id)| (*id, features.get(row, Feature::Seen) > 0.5))
            .collect()
    }
}

impl Ranker for SeenDemotionRanker {
    fn name(&self) -> &'static str {
        "seen_demotion_ranker"
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
        features: Option<&FeatureMatrix>,
    ) -> RankedResult {
        let seen = features.map(Self::seen_ids).unwrap_or_default();

        let scored = candidates
            .iter()
            .map(|id| {
                let score = predicted_score(predictions, *id);
                if seen.get(id).copied().unwrap_or(false) {
                    (*id, score * SEEN_DEMOTION_FACTOR)
                } else {
                    (*id, score)
                }
            })
            .collect();
        let ranked = order_by_score(scored, limit, config.inverse_ranker);

        debug!(
            team = team.as_str(),
            user_id,
            ranked = ranked.len(),
            demoted = seen.values().filter(|s| **s).count(),
            "Candidates ranked with seen demotion"
        );
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PredictionScore;
    use crate::services::collector::DataCollector;
    use crate::services::features::FeatureGenerator;
    use crate::store::fixtures::{self, ACTIVE_USER};
    use std::time::Duration;

    async fn matrix(candidates: &[ContentId]) -> FeatureMatrix {
        let store = fixtures::memory_store();
        let mut collector = DataCollector::new(store.clone(), store, Duration::from_secs(1));
        collector.gather(ACTIVE_USER, candidates).await.unwrap();
        FeatureGenerator::new(&collector, candidates).into_matrix()
    }

    fn predictions() -> Prediction {
        // 22 was seen by the active user
        [(22, 0.9), (5, 0.6), (6, 0.3)]
            .into_iter()
            .map(|(id, score)| {
                (
                    id,
                    PredictionScore {
                        score,
                        upstream_score: 0.0,
                    },
                )
            })
            .collect()
    }

    fn rank(candidates: &[ContentId], features: Option<&FeatureMatrix>) -> RankedResult {
        SeenDemotionRanker.rank_ids(
            TeamName::FoxtrotF2023,
            ACTIVE_USER,
            candidates,
            10,
            &predictions(),
            Seed::normalize(0.5),
            &RequestConfig::default(),
            features,
        )
    }

    #[tokio::test]
    async fn test_seen_content_demoted() {
        let candidates = [22, 5, 6];
        let features = matrix(&candidates).await;

        // 0.9 * 0.5 = 0.45 drops below 5
        assert_eq!(rank(&candidates, Some(&features)), vec![5, 22, 6]);
    }

    #[test]
    fn test_without_features_sorts_by_score() {
        assert_eq!(rank(&[22, 5, 6], None), vec![22, 5, 6]);
    }
}
