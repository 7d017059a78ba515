use super::{Controller, ControllerKind, PipelineContext, PipelineSettings};
use crate::error::Result;
use crate::metrics;
use crate::models::{PipelineRequest, RankedResult, TeamName};
use crate::services::filtering::{CandidateFilter, FilterInput, RandomFilter};
use crate::services::generators::{fan_in, CandidateGenerator, RandomGenerator};
use crate::services::prediction::{PredictionModel, RandomModel};
use crate::services::ranking::{Ranker, ScoreRanker};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Control arm: shuffled catalog -> random drop -> random scores -> sort.
pub struct RandomController {
    generator: Arc<dyn CandidateGenerator>,
    settings: PipelineSettings,
}

impl RandomController {
    pub fn new(context: &PipelineContext) -> Self {
        Self {
            generator: Arc::new(RandomGenerator::new(context.stores.content.clone())),
            settings: context.settings.clone(),
        }
    }
}

#[async_trait]
impl Controller for RandomController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Random
    }

    fn team(&self) -> TeamName {
        TeamName::Random
    }

    async fn get_content_ids(&self, request: &PipelineRequest) -> Result<RankedResult> {
        let team = self.team();
        let user_id = request.user_id;

        let started = Instant::now();
        let candidate_limit = request
            .limit
            .saturating_mul(self.settings.random_candidate_multiplier);
        let pool = fan_in(
            std::slice::from_ref(&self.generator),
            team,
            request,
            candidate_limit,
            self.settings.generator_timeout,
        )
        .await?;
        metrics::record_stage_duration(team, "generate", started.elapsed());

        let started = Instant::now();
        let filtered = RandomFilter.filter_ids(
            team,
            user_id,
            &pool.ids,
            request.seed,
            &request.config,
            FilterInput::Amount(self.settings.random_filter_amount),
        )?;
        metrics::record_stage_duration(team, "filter", started.elapsed());

        let started = Instant::now();
        let predictions = RandomModel.predict_probabilities(
            team,
            &filtered,
            user_id,
            request.seed,
            &pool.upstream_scores(),
            None,
        )?;
        metrics::record_stage_duration(team, "predict", started.elapsed());

        let ranked = ScoreRanker.rank_ids(
            team,
            user_id,
            &filtered,
            request.limit,
            &predictions,
            request.seed,
            &request.config,
            None,
        );

        debug!(
            generated = pool.len(),
            filtered = filtered.len(),
            ranked = ranked.len(),
            "Random pipeline finished"
        );

        Ok(ranked)
    }
}
