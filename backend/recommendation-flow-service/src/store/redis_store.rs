use super::{EngagementCounts, EngagementStore, LikeDislike};
use crate::models::{ContentId, UserId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::{HashMap, HashSet};

/// Redis key prefixes
const CONTENT_ENGAGEMENT_KEY: &str = "content:engagement:";
const CONTENT_MOST_LIKED_KEY: &str = "content:most_liked";
const USER_ENGAGEMENT_KEY: &str = "user:engagement:";
const USER_RECENT_ITEMS_KEY: &str = "user:recent_items:";
const USER_SIMILAR_KEY: &str = "user:similar:";
const USER_BLOCKED_AUTHORS_KEY: &str = "user:blocked_authors:";

/// Engagement signals kept in Redis by the engagement pipeline.
///
/// Layout:
/// - `content:engagement:{id}`     -> Hash {likes, dislikes}
/// - `content:most_liked`          -> Sorted Set (score = like count)
/// - `user:engagement:{user}`      -> Hash content_id -> "1" (like) / "-1" (dislike)
/// - `user:recent_items:{user}`    -> Sorted Set of viewed content ids
/// - `user:similar:{user}`         -> Sorted Set of similar users (score = similarity)
/// - `user:blocked_authors:{user}` -> Set of author names
pub struct RedisEngagementStore {
    redis_client: redis::Client,
}

impl RedisEngagementStore {
    pub fn new(redis_client: redis::Client) -> Self {
        Self { redis_client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.redis_client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to get Redis connection")
    }
}

fn parse_engagement(raw: &str) -> Option<LikeDislike> {
    match raw.trim() {
        "1" => Some(LikeDislike::Like),
        "-1" => Some(LikeDislike::Dislike),
        _ => None,
    }
}

#[async_trait]
impl EngagementStore for RedisEngagementStore {
    async fn engagement_counts(
        &self,
        ids: &[ContentId],
    ) -> Result<HashMap<ContentId, EngagementCounts>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for id in ids {
            pipe.hgetall(format!("{}{}", CONTENT_ENGAGEMENT_KEY, id));
        }

        let rows: Vec<HashMap<String, u64>> = pipe
            .query_async(&mut conn)
            .await
            .context("Failed to fetch engagement counts from Redis")?;

        Ok(ids
            .iter()
            .zip(rows)
            .map(|(id, row)| {
                let counts = EngagementCounts {
                    likes: row.get("likes").copied().unwrap_or(0),
                    dislikes: row.get("dislikes").copied().unwrap_or(0),
                };
                (*id, counts)
            })
            .collect())
    }

    async fn user_engagement(
        &self,
        user_id: UserId,
        ids: &[ContentId],
    ) -> Result<HashMap<ContentId, LikeDislike>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.connection().await?;
        let key = format!("{}{}", USER_ENGAGEMENT_KEY, user_id);
        let values: Vec<Option<String>> = conn
            .hget(&key, ids)
            .await
            .context("Failed to fetch user engagement from Redis")?;

        Ok(ids
            .iter()
            .zip(values)
            .filter_map(|(id, value)| value.as_deref().and_then(parse_engagement).map(|v| (*id, v)))
            .collect())
    }

    async fn seen_content(&self, user_id: UserId) -> Result<HashSet<ContentId>> {
        let mut conn = self.connection().await?;
        let key = format!("{}{}", USER_RECENT_ITEMS_KEY, user_id);

        let items: Vec<ContentId> = conn
            .zrange(&key, 0, -1)
            .await
            .context("Failed to fetch seen items from Redis")?;

        Ok(items.into_iter().collect())
    }

    async fn liked_content(&self, user_id: UserId) -> Result<Vec<ContentId>> {
        let mut conn = self.connection().await?;
        let key = format!("{}{}", USER_ENGAGEMENT_KEY, user_id);

        let engagements: HashMap<ContentId, String> = conn
            .hgetall(&key)
            .await
            .context("Failed to fetch liked items from Redis")?;

        let mut liked: Vec<ContentId> = engagements
            .into_iter()
            .filter(|(_, value)| parse_engagement(value) == Some(LikeDislike::Like))
            .map(|(id, _)| id)
            .collect();
        liked.sort_unstable();
        Ok(liked)
    }

    async fn blocked_authors(&self, user_id: UserId) -> Result<HashSet<String>> {
        let mut conn = self.connection().await?;
        let key = format!("{}{}", USER_BLOCKED_AUTHORS_KEY, user_id);

        conn.smembers(&key)
            .await
            .context("Failed to fetch blocked authors from Redis")
    }

    async fn similar_users(
        &self,
        user_id: UserId,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<(UserId, f64)>> {
        let mut conn = self.connection().await?;
        let key = format!("{}{}", USER_SIMILAR_KEY, user_id);

        let similar: Vec<(UserId, f64)> = conn
            .zrevrangebyscore_limit_withscores(&key, "+inf", min_similarity, 0, limit as isize)
            .await
            .context("Failed to fetch similar users from Redis")?;

        Ok(similar)
    }

    async fn most_liked(&self, limit: usize) -> Result<Vec<(ContentId, u64)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.connection().await?;
        let popular: Vec<(ContentId, f64)> = conn
            .zrevrange_withscores(CONTENT_MOST_LIKED_KEY, 0, (limit - 1) as isize)
            .await
            .context("Failed to fetch most liked content from Redis")?;

        let mut popular: Vec<(ContentId, u64)> = popular
            .into_iter()
            .map(|(id, likes)| (id, likes.max(0.0) as u64))
            .collect();
        // ZREVRANGE orders equal scores by descending member; keep the id-ascending tie-break
        popular.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(popular)
    }
}
