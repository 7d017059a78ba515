use super::CandidateGenerator;
use crate::models::{ContentId, GeneratedCandidates, RequestConfig, TeamName, UserId};
use crate::store::{EmbeddingIndex, EngagementStore};
use crate::utils::{normalize_score, Seed};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Anchor-based retrieval ("your choice").
///
/// With an anchor id in the request config, returns the anchor's nearest
/// neighbours (the anchor itself excluded) scored by similarity. Without one,
/// or when the anchor has no embedding, returns the most liked content with
/// like counts normalized to [0, 1]. Either way the output is a pure function
/// of the stores and the request window.
pub struct ExampleGenerator {
    embeddings: Arc<dyn EmbeddingIndex>,
    engagement: Arc<dyn EngagementStore>,
}

impl ExampleGenerator {
    pub fn new(embeddings: Arc<dyn EmbeddingIndex>, engagement: Arc<dyn EngagementStore>) -> Self {
        Self {
            embeddings,
            engagement,
        }
    }

    async fn similar_to_anchor(
        &self,
        anchor: ContentId,
        limit: usize,
        offset: usize,
    ) -> Result<Option<GeneratedCandidates>> {
        let Some(anchor_vector) = self
            .embeddings
            .content_embedding(anchor)
            .await
            .context("Failed to load anchor embedding")?
        else {
            return Ok(None);
        };

        let neighbours = self
            .embeddings
            .nearest(&anchor_vector, offset + limit, Some(anchor))
            .await
            .context("Anchor neighbour search failed")?;

        let (ids, scores) = neighbours.into_iter().skip(offset).unzip();
        Ok(Some(GeneratedCandidates::scored(ids, scores)))
    }

    async fn most_liked(&self, limit: usize, offset: usize) -> Result<GeneratedCandidates> {
        let popular = self
            .engagement
            .most_liked(offset + limit)
            .await
            .context("Failed to load popular content")?;

        let max_likes = popular.first().map(|(_, likes)| *likes).unwrap_or(0) as f64;
        let (ids, scores) = popular
            .into_iter()
            .skip(offset)
            .map(|(id, likes)| (id, normalize_score(likes as f64, 0.0, max_likes)))
            .unzip();

        Ok(GeneratedCandidates::scored(ids, scores))
    }
}

#[async_trait]
impl CandidateGenerator for ExampleGenerator {
    fn name(&self) -> &'static str {
        "example_anchor"
    }

    async fn get_content_ids(
        &self,
        team: TeamName,
        _user_id: UserId,
        limit: usize,
        offset: usize,
        _seed: Seed,
        config: &RequestConfig,
    ) -> Result<GeneratedCandidates> {
        if let Some(anchor) = config.anchor_content_id {
            match self.similar_to_anchor(anchor, limit, offset).await? {
                Some(generated) => {
                    debug!(team = team.as_str(), anchor, candidates = generated.len(), "Anchor neighbours generated");
                    return Ok(generated);
                }
                None => {
                    warn!(team = team.as_str(), anchor, "Anchor has no embedding, falling back to popular content");
                }
            }
        }

        self.most_liked(limit, offset).await
    }
}
