// ============================================
// Store Contracts
// ============================================
//
// Read-only data sources the pipeline consults:
// 1. ContentStore    - catalog ids and metadata
// 2. EngagementStore - likes, seen items, blocks, user similarity
// 3. EmbeddingIndex  - two-tower vectors and nearest-neighbour search
//
// Generators and the data collector only read through these traits; none
// of them ever write.

mod memory;
mod redis_store;

pub use memory::{CatalogSnapshot, EngagementRecord, InMemoryStore, SimilarUser};
pub use redis_store::RedisEngagementStore;

use crate::models::{ContentId, ContentItem, UserId};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub likes: u64,
    pub dislikes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeDislike {
    Like,
    Dislike,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Every content id in the catalog, ascending.
    async fn all_content_ids(&self) -> Result<Vec<ContentId>>;

    /// Metadata for the ids that exist; unknown ids are absent from the map.
    async fn get_contents(&self, ids: &[ContentId]) -> Result<HashMap<ContentId, ContentItem>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngagementStore: Send + Sync {
    async fn engagement_counts(
        &self,
        ids: &[ContentId],
    ) -> Result<HashMap<ContentId, EngagementCounts>>;

    /// The user's own like/dislike state for each id they engaged with.
    async fn user_engagement(
        &self,
        user_id: UserId,
        ids: &[ContentId],
    ) -> Result<HashMap<ContentId, LikeDislike>>;

    /// Content the user has viewed or engaged with.
    async fn seen_content(&self, user_id: UserId) -> Result<HashSet<ContentId>>;

    async fn liked_content(&self, user_id: UserId) -> Result<Vec<ContentId>>;

    async fn blocked_authors(&self, user_id: UserId) -> Result<HashSet<String>>;

    /// Similar users with similarity >= `min_similarity`, most similar first.
    async fn similar_users(
        &self,
        user_id: UserId,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<(UserId, f64)>>;

    /// Catalog popularity: (id, like count), most liked first, ties by id.
    async fn most_liked(&self, limit: usize) -> Result<Vec<(ContentId, u64)>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    async fn user_embedding(&self, user_id: UserId) -> Result<Option<Vec<f32>>>;

    async fn content_embedding(&self, content_id: ContentId) -> Result<Option<Vec<f32>>>;

    /// Up to `k` nearest content vectors by cosine similarity, best first,
    /// ties broken by ascending id.
    async fn nearest(
        &self,
        query: &[f32],
        k: usize,
        exclude: Option<ContentId>,
    ) -> Result<Vec<(ContentId, f64)>>;
}

/// Shared handles to every store, cloned into each generator and collector.
#[derive(Clone)]
pub struct Stores {
    pub content: Arc<dyn ContentStore>,
    pub engagement: Arc<dyn EngagementStore>,
    pub embeddings: Arc<dyn EmbeddingIndex>,
}

impl Stores {
    pub fn new(
        content: Arc<dyn ContentStore>,
        engagement: Arc<dyn EngagementStore>,
        embeddings: Arc<dyn EmbeddingIndex>,
    ) -> Self {
        Self {
            content,
            engagement,
            embeddings,
        }
    }

    /// Serve everything from one in-memory catalog.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            content: store.clone(),
            engagement: store.clone(),
            embeddings: store,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures;
