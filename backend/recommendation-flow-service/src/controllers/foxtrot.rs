use super::{Controller, ControllerKind, PipelineContext, PipelineSettings};
use crate::error::Result;
use crate::metrics;
use crate::models::{PipelineRequest, RankedResult, RequestConfig, TeamName};
use crate::services::collector::DataCollector;
use crate::services::features::FeatureGenerator;
use crate::services::filtering::{CandidateFilter, FilterInput, PolicyFilter};
use crate::services::generators::{
    fan_in, CandidateGenerator, CollaborativeFilteredSimilarUsersGenerator, ExampleGenerator,
    TwoTowerAnnGenerator,
};
use crate::services::prediction::{LinearModel, PredictionModel, RandomModel};
use crate::services::ranking::{Ranker, SeenDemotionRanker};
use crate::store::Stores;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Flag-gated fan-in arm.
///
/// Pipeline:
/// 1. Fan in over the enabled generators (two tower, collaborative, your choice)
/// 2. Gather collector signals once over the concatenated pool
/// 3. Policy filter
/// 4. Features over the survivors
/// 5. Linear model, or random scores when `random_predictions` is set
/// 6. Rank with seen-content demotion
pub struct FoxtrotController {
    stores: Stores,
    settings: PipelineSettings,
    two_tower: Arc<dyn CandidateGenerator>,
    collab_filter: Arc<dyn CandidateGenerator>,
    your_choice: Arc<dyn CandidateGenerator>,
    linear_model: LinearModel,
}

impl FoxtrotController {
    pub fn new(context: &PipelineContext) -> Self {
        let stores = &context.stores;
        Self::with_generators(
            context,
            Arc::new(TwoTowerAnnGenerator::new(stores.embeddings.clone())),
            Arc::new(CollaborativeFilteredSimilarUsersGenerator::new(
                stores.engagement.clone(),
            )),
            Arc::new(ExampleGenerator::new(
                stores.embeddings.clone(),
                stores.engagement.clone(),
            )),
        )
    }

    /// Build with explicit generators for the three flag slots.
    pub fn with_generators(
        context: &PipelineContext,
        two_tower: Arc<dyn CandidateGenerator>,
        collab_filter: Arc<dyn CandidateGenerator>,
        your_choice: Arc<dyn CandidateGenerator>,
    ) -> Self {
        Self {
            stores: context.stores.clone(),
            settings: context.settings.clone(),
            two_tower,
            collab_filter,
            your_choice,
            linear_model: LinearModel::new(context.linear_weights.clone()),
        }
    }

    /// Enabled generators, always in two_tower, collab_filter, your_choice order.
    fn selected_generators(&self, config: &RequestConfig) -> Vec<Arc<dyn CandidateGenerator>> {
        [
            (config.two_tower, &self.two_tower),
            (config.collab_filter, &self.collab_filter),
            (config.your_choice, &self.your_choice),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, generator)| generator.clone())
        .collect()
    }
}

#[async_trait]
impl Controller for FoxtrotController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Foxtrot
    }

    fn team(&self) -> TeamName {
        TeamName::FoxtrotF2023
    }

    async fn get_content_ids(&self, request: &PipelineRequest) -> Result<RankedResult> {
        let team = self.team();
        let user_id = request.user_id;
        let config = &request.config;

        // Stage 1: fan-in
        let started = Instant::now();
        let generators = self.selected_generators(config);
        let pool = fan_in(
            &generators,
            team,
            request,
            self.settings.foxtrot_candidate_limit,
            self.settings.generator_timeout,
        )
        .await?;
        metrics::record_stage_duration(team, "generate", started.elapsed());

        if pool.is_empty() {
            debug!(generators = generators.len(), "No candidates generated");
            return Ok(RankedResult::new());
        }

        // Stage 2: collect signals once for the whole pool
        let started = Instant::now();
        let mut collector = DataCollector::new(
            self.stores.content.clone(),
            self.stores.engagement.clone(),
            self.settings.collector_timeout,
        );
        collector.gather(user_id, &pool.ids).await?;
        metrics::record_stage_duration(team, "collect", started.elapsed());

        // Stage 3: policy filter
        let started = Instant::now();
        let filtered = PolicyFilter.filter_ids(
            team,
            user_id,
            &pool.ids,
            request.seed,
            config,
            FilterInput::Collector(&collector),
        )?;
        metrics::record_stage_duration(team, "filter", started.elapsed());

        // Stage 4 + 5: features and predictions
        let started = Instant::now();
        let features = FeatureGenerator::new(&collector, &filtered).into_matrix();
        let upstream = pool.upstream_scores();
        let predictions = if config.random_predictions {
            RandomModel.predict_probabilities(
                team,
                &filtered,
                user_id,
                request.seed,
                &upstream,
                Some(&features),
            )?
        } else {
            self.linear_model.predict_probabilities(
                team,
                &filtered,
                user_id,
                request.seed,
                &upstream,
                config.linear_model.then_some(&features),
            )?
        };
        metrics::record_stage_duration(team, "predict", started.elapsed());

        // Stage 6: rank
        let ranked = SeenDemotionRanker.rank_ids(
            team,
            user_id,
            &filtered,
            request.limit,
            &predictions,
            request.seed,
            config,
            Some(&features),
        );

        debug!(
            generators = generators.len(),
            generated = pool.len(),
            filtered = filtered.len(),
            ranked = ranked.len(),
            "Foxtrot pipeline finished"
        );

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeneratedCandidates;
    use crate::services::generators::test_support::{FailingGenerator, StaticGenerator};
    use crate::services::prediction::LinearModelWeights;
    use crate::store::fixtures::{self, ACTIVE_USER, CATALOG_SIZE};
    use crate::utils::Seed;

    fn context() -> PipelineContext {
        PipelineContext::new(
            fixtures::stores(),
            PipelineSettings::default(),
            LinearModelWeights::default(),
        )
    }

    fn request(limit: usize, config: RequestConfig) -> PipelineRequest {
        PipelineRequest {
            user_id: ACTIVE_USER,
            limit,
            offset: 0,
            seed: Seed::normalize(0.5),
            config,
        }
    }

    fn fixed(name: &'static str, ids: Vec<i64>) -> Arc<dyn CandidateGenerator> {
        Arc::new(StaticGenerator {
            name,
            output: GeneratedCandidates::unscored(ids),
            delay: None,
        })
    }

    #[tokio::test]
    async fn test_default_flags_return_real_unseen_ids() {
        let controller = FoxtrotController::new(&context());
        let ranked = controller
            .get_content_ids(&request(10, RequestConfig::default()))
            .await
            .unwrap();

        assert!(!ranked.is_empty());
        assert!(ranked.len() <= 10);
        assert!(ranked.iter().all(|id| (1..=CATALOG_SIZE).contains(id)));
        // seen, liked, flagged and blocked-author items are filtered out
        for excluded in [20, 21, 22, 23, 13, 26, 4, 9] {
            assert!(!ranked.contains(&excluded));
        }
    }

    #[tokio::test]
    async fn test_deterministic_for_seed() {
        let controller = FoxtrotController::new(&context());
        let config = RequestConfig {
            random_predictions: true,
            ..RequestConfig::default()
        };

        let first = controller.get_content_ids(&request(10, config.clone())).await.unwrap();
        let second = controller.get_content_ids(&request(10, config)).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_no_generators_enabled_is_empty() {
        let controller = FoxtrotController::new(&context());
        let ranked = controller
            .get_content_ids(&request(10, RequestConfig::disabled()))
            .await
            .unwrap();

        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn test_failing_generator_does_not_fail_request() {
        let controller = FoxtrotController::with_generators(
            &context(),
            fixed("first", vec![1, 2, 3]),
            Arc::new(FailingGenerator),
            fixed("third", vec![5, 6]),
        );

        let ranked = controller
            .get_content_ids(&request(10, RequestConfig::default()))
            .await
            .unwrap();

        let mut sorted = ranked.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 5, 6]);
    }

    #[tokio::test]
    async fn test_every_selected_generator_failing_fails_request() {
        let controller = FoxtrotController::with_generators(
            &context(),
            Arc::new(FailingGenerator),
            Arc::new(FailingGenerator),
            fixed("third", vec![5, 6]),
        );
        let config = RequestConfig {
            your_choice: false,
            ..RequestConfig::default()
        };

        let result = controller.get_content_ids(&request(10, config)).await;

        assert!(matches!(
            result,
            Err(crate::error::PipelineError::Failure { stage: "generate", .. })
        ));
    }

    #[tokio::test]
    async fn test_flags_select_generators() {
        let controller = FoxtrotController::with_generators(
            &context(),
            fixed("first", vec![1]),
            fixed("second", vec![2]),
            fixed("third", vec![3]),
        );
        let config = RequestConfig {
            two_tower: false,
            your_choice: false,
            ..RequestConfig::default()
        };

        let ranked = controller.get_content_ids(&request(10, config)).await.unwrap();

        assert_eq!(ranked, vec![2]);
    }

    #[tokio::test]
    async fn test_inverse_ranker_reverses_order() {
        // Distinct engagement and affinity, so no two candidates tie
        let controller = FoxtrotController::with_generators(
            &context(),
            fixed("first", vec![1, 2, 5, 11, 16]),
            fixed("second", vec![]),
            fixed("third", vec![]),
        );

        let normal = controller
            .get_content_ids(&request(10, RequestConfig::default()))
            .await
            .unwrap();
        let inverse = controller
            .get_content_ids(&request(
                10,
                RequestConfig {
                    inverse_ranker: true,
                    ..RequestConfig::default()
                },
            ))
            .await
            .unwrap();

        let mut reversed = normal.clone();
        reversed.reverse();
        assert_eq!(inverse, reversed);
    }
}
