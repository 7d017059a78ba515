use super::{
    CatalogSnapshot, EngagementCounts, EngagementRecord, EngagementStore, InMemoryStore, LikeDislike,
    SimilarUser, Stores,
};
use crate::models::{ContentId, ContentItem, UserId};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const CATALOG_SIZE: ContentId = 40;
/// Has an embedding, likes, seen items, a blocked author and similar users.
pub const ACTIVE_USER: i64 = 1;

pub fn content_item(id: ContentId) -> ContentItem {
    ContentItem {
        id,
        author: format!("author{}", id % 5),
        text: None,
        original_prompt: Some(format!("original prompt {}", id)),
        style: Some("photo".to_string()),
        prompt: Some(format!("prompt {}", id)),
        width: Some(512),
        height: Some(if id % 2 == 0 { 768 } else { 512 }),
        url: Some(format!("https://cdn.example.com/{}.png", id)),
        download_url: None,
        flagged: id % 13 == 0,
    }
}

pub fn snapshot() -> CatalogSnapshot {
    let like = |user_id, content_id| EngagementRecord {
        user_id,
        content_id,
        value: LikeDislike::Like,
    };

    let mut engagements: Vec<EngagementRecord> = Vec::new();
    engagements.extend((1..=10).map(|id| like(2, id)));
    engagements.extend((5..=15).map(|id| like(3, id)));
    engagements.extend((1..=3).map(|id| EngagementRecord {
        user_id: 4,
        content_id: id,
        value: LikeDislike::Dislike,
    }));
    engagements.extend([like(ACTIVE_USER, 20), like(ACTIVE_USER, 21)]);

    CatalogSnapshot {
        contents: (1..=CATALOG_SIZE).map(content_item).collect(),
        engagements,
        seen: HashMap::from([(ACTIVE_USER, vec![22, 23])]),
        blocked_authors: HashMap::from([(ACTIVE_USER, vec!["author4".to_string()])]),
        similar_users: HashMap::from([(
            ACTIVE_USER,
            vec![
                SimilarUser { user_id: 2, similarity: 0.9 },
                SimilarUser { user_id: 3, similarity: 0.6 },
                SimilarUser { user_id: 4, similarity: 0.05 },
            ],
        )]),
        content_embeddings: (1..=CATALOG_SIZE)
            .map(|id| {
                let angle = id as f32;
                (id, vec![angle.cos(), angle.sin(), (id % 7) as f32 / 7.0])
            })
            .collect(),
        user_embeddings: HashMap::from([(ACTIVE_USER, vec![1.0, 0.0, 0.5]), (2, vec![0.0, 1.0, 0.2])]),
    }
}

pub fn memory_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::from_snapshot(snapshot()).expect("fixture catalog is valid"))
}

pub fn stores() -> Stores {
    Stores::in_memory(memory_store())
}

/// Engagement store over the fixture catalog whose `slow` lookup stalls for
/// `delay` on its first `stalled_calls` calls, then answers normally.
pub struct SlowEngagementStore {
    inner: Arc<InMemoryStore>,
    slow: &'static str,
    delay: Duration,
    stalled_calls: AtomicUsize,
}

impl SlowEngagementStore {
    pub fn new(slow: &'static str, delay: Duration, stalled_calls: usize) -> Self {
        Self {
            inner: memory_store(),
            slow,
            delay,
            stalled_calls: AtomicUsize::new(stalled_calls),
        }
    }

    async fn maybe_stall(&self, lookup: &str) {
        if lookup != self.slow {
            return;
        }
        let stall = self
            .stalled_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if stall {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl EngagementStore for SlowEngagementStore {
    async fn engagement_counts(&self, ids: &[ContentId]) -> Result<HashMap<ContentId, EngagementCounts>> {
        self.maybe_stall("engagement_counts").await;
        self.inner.engagement_counts(ids).await
    }

    async fn user_engagement(
        &self,
        user_id: UserId,
        ids: &[ContentId],
    ) -> Result<HashMap<ContentId, LikeDislike>> {
        self.inner.user_engagement(user_id, ids).await
    }

    async fn seen_content(&self, user_id: UserId) -> Result<HashSet<ContentId>> {
        self.maybe_stall("seen_content").await;
        self.inner.seen_content(user_id).await
    }

    async fn liked_content(&self, user_id: UserId) -> Result<Vec<ContentId>> {
        self.maybe_stall("liked_content").await;
        self.inner.liked_content(user_id).await
    }

    async fn blocked_authors(&self, user_id: UserId) -> Result<HashSet<String>> {
        self.maybe_stall("blocked_authors").await;
        self.inner.blocked_authors(user_id).await
    }

    async fn similar_users(
        &self,
        user_id: UserId,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<(UserId, f64)>> {
        self.inner.similar_users(user_id, min_similarity, limit).await
    }

    async fn most_liked(&self, limit: usize) -> Result<Vec<(ContentId, u64)>> {
        self.inner.most_liked(limit).await
    }
}
