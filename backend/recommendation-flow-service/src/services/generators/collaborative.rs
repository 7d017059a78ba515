use super::CandidateGenerator;
use crate::models::{ContentId, GeneratedCandidates, RequestConfig, TeamName, UserId, ANONYMOUS_USER};
use crate::store::EngagementStore;
use crate::utils::Seed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Configuration
const MAX_SIMILAR_USERS: usize = 20; // Max similar users to consider
const MIN_USER_SIMILARITY: f64 = 0.1; // Minimum user similarity threshold

/// User-based collaborative filtering over the precomputed similarity graph.
///
/// Algorithm:
/// 1. Find users similar to the target user
/// 2. Collect the content each of them liked
/// 3. Score each item by the highest similarity of a user who liked it
/// 4. Order by score, then by id
pub struct CollaborativeFilteredSimilarUsersGenerator {
    engagement: Arc<dyn EngagementStore>,
}

impl CollaborativeFilteredSimilarUsersGenerator {
    pub fn new(engagement: Arc<dyn EngagementStore>) -> Self {
        Self { engagement }
    }
}

#[async_trait]
impl CandidateGenerator for CollaborativeFilteredSimilarUsersGenerator {
    fn name(&self) -> &'static str {
        "collaborative_similar_users"
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

        let similar_users: Vec<(UserId, f64)> = self
            .engagement
            .similar_users(user_id, MIN_USER_SIMILARITY, MAX_SIMILAR_USERS)
            .await
            .context("Failed to load similar users")?
            .into_iter()
            .filter(|(other, _)| *other != user_id)
            .collect();

        if similar_users.is_empty() {
            debug!(team = team.as_str(), user_id, "No similar users, collaborative returns empty");
            return Ok(GeneratedCandidates::empty());
        }

        let liked = try_join_all(
            similar_users
                .iter()
                .map(|(other, _)| self.engagement.liked_content(*other)),
        )
        .await
        .context("Failed to load likes of similar users")?;

        let mut candidate_scores: BTreeMap<ContentId, f64> = BTreeMap::new();
        for ((_, similarity), content_ids) in similar_users.iter().zip(liked) {
            for content_id in content_ids {
                candidate_scores
                    .entry(content_id)
                    .and_modify(|score| *score = score.max(*similarity))
                    .or_insert(*similarity);
            }
        }

        // BTreeMap iteration is id-ascending, so the stable sort breaks ties by id
        let mut scored: Vec<(ContentId, f64)> = candidate_scores.into_iter().collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        debug!(
            team = team.as_str(),
            user_id,
            similar_users = similar_users.len(),
            candidates = scored.len(),
            "Collaborative candidates aggregated"
        );

        let (ids, scores) = scored.into_iter().skip(offset).take(limit).unzip();
        Ok(GeneratedCandidates::scored(ids, scores))
    }
}
