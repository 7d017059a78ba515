use super::CandidateGenerator;
use crate::models::{GeneratedCandidates, RequestConfig, TeamName, UserId, ANONYMOUS_USER};
use crate::store::EmbeddingIndex;
use crate::utils::Seed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Two-tower retrieval: nearest content vectors to the user tower embedding.
///
/// Scores are cosine similarities. Users without an embedding, including
/// logged-out callers, get nothing from this source.
pub struct TwoTowerAnnGenerator {
    embeddings: Arc<dyn EmbeddingIndex>,
}

impl TwoTowerAnnGenerator {
    pub fn new(embeddings: Arc<dyn EmbeddingIndex>) -> Self {
        Self { embeddings }
    }
}

#[async_trait]
impl CandidateGenerator for TwoTowerAnnGenerator {
    fn name(&self) -> &'static str {
        "two_tower_ann"
    }

    async fn get_content_ids(
        &self,
        team: TeamName,
        user_id: UserId,
        limit: usize,
        offset: usize,
        _seed: Seed,
        _config: &RequestConfig,
    ) -> Result<GeneratedCandidates> {
        if user_id == ANONYMOUS_USER {
            return Ok(GeneratedCandidates::empty());
        }

        let Some(user_vector) = self
            .embeddings
            .user_embedding(user_id)
            .await
            .context("Failed to load user tower embedding")?
        else {
            debug!(team = team.as_str(), user_id, "No user embedding, two-tower returns empty");
            return Ok(GeneratedCandidates::empty());
        };

        let neighbours = self
            .embeddings
            .nearest(&user_vector, offset + limit, None)
            .await
            .context("Nearest-neighbour search failed")?;

        let (ids, scores) = neighbours.into_iter().skip(offset).unzip();
        Ok(GeneratedCandidates::scored(ids, scores))
    }
}
