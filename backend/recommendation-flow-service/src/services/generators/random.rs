use super::CandidateGenerator;
use crate::models::{GeneratedCandidates, RequestConfig, TeamName, UserId};
use crate::store::ContentStore;
use crate::utils::Seed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Uniform sample of the whole catalog.
///
/// The catalog is shuffled with the request seed and then windowed by
/// `offset`/`limit`, so paging with the same seed walks one fixed permutation.
pub struct RandomGenerator {
    content: Arc<dyn ContentStore>,
}

impl RandomGenerator {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }
}

#[async_trait]
impl CandidateGenerator for RandomGenerator {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn get_content_ids(
        &self,
        _team: TeamName,
        _user_id: UserId,
        limit: usize,
        offset: usize,
        seed: Seed,
        _config: &RequestConfig,
    ) -> Result<GeneratedCandidates> {
        let mut ids = self
            .content
            .all_content_ids()
            .await
            .context("Failed to list catalog for random generation")?;

        ids.shuffle(&mut seed.rng("generator:random"));

        Ok(GeneratedCandidates::unscored(
            ids.into_iter().skip(offset).take(limit).collect(),
        ))
    }
}
