use super::{ContentStore, EmbeddingIndex, EngagementCounts, EngagementStore, LikeDislike};
use crate::models::{ContentId, ContentItem, UserId};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// On-disk catalog format loaded at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub contents: Vec<ContentItem>,
    #[serde(default)]
    pub engagements: Vec<EngagementRecord>,
    #[serde(default)]
    pub seen: HashMap<UserId, Vec<ContentId>>,
    #[serde(default)]
    pub blocked_authors: HashMap<UserId, Vec<String>>,
    #[serde(default)]
    pub similar_users: HashMap<UserId, Vec<SimilarUser>>,
    #[serde(default)]
    pub content_embeddings: HashMap<ContentId, Vec<f32>>,
    #[serde(default)]
    pub user_embeddings: HashMap<UserId, Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub user_id: UserId,
    pub content_id: ContentId,
    pub value: LikeDislike,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarUser {
    pub user_id: UserId,
    pub similarity: f64,
}

/// Immutable in-memory catalog serving all three store contracts.
///
/// Embedding search is exact: content vectors are L2-normalized into one
/// matrix and scored with a single matrix-vector product.
pub struct InMemoryStore {
    contents: BTreeMap<ContentId, ContentItem>,
    counts: HashMap<ContentId, EngagementCounts>,
    user_engagement: HashMap<UserId, BTreeMap<ContentId, LikeDislike>>,
    seen: HashMap<UserId, HashSet<ContentId>>,
    blocked_authors: HashMap<UserId, HashSet<String>>,
    similar_users: HashMap<UserId, Vec<(UserId, f64)>>,
    user_embeddings: HashMap<UserId, Vec<f32>>,
    content_embeddings: HashMap<ContentId, Vec<f32>>,
    index_ids: Vec<ContentId>,
    index: Array2<f32>,
}

impl InMemoryStore {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog from {}", path.display()))?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;

        Self::from_snapshot(snapshot)
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self> {
        let contents: BTreeMap<ContentId, ContentItem> = snapshot
            .contents
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        // Later records for the same (user, content) pair replace earlier ones
        let mut user_engagement: HashMap<UserId, BTreeMap<ContentId, LikeDislike>> =
            HashMap::new();
        for record in snapshot.engagements {
            user_engagement
                .entry(record.user_id)
                .or_default()
                .insert(record.content_id, record.value);
        }

        let mut counts: HashMap<ContentId, EngagementCounts> = HashMap::new();
        for engagements in user_engagement.values() {
            for (content_id, value) in engagements {
                let entry = counts.entry(*content_id).or_default();
                match value {
                    LikeDislike::Like => entry.likes += 1,
                    LikeDislike::Dislike => entry.dislikes += 1,
                }
            }
        }

        let mut seen: HashMap<UserId, HashSet<ContentId>> = snapshot
            .seen
            .into_iter()
            .map(|(user_id, ids)| (user_id, ids.into_iter().collect()))
            .collect();
        for (user_id, engagements) in &user_engagement {
            seen.entry(*user_id)
                .or_default()
                .extend(engagements.keys().copied());
        }

        let blocked_authors = snapshot
            .blocked_authors
            .into_iter()
            .map(|(user_id, authors)| (user_id, authors.into_iter().collect()))
            .collect();

        let similar_users = snapshot
            .similar_users
            .into_iter()
            .map(|(user_id, mut similar)| {
                similar.sort_by(|a, b| {
                    b.similarity
                        .partial_cmp(&a.similarity)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.user_id.cmp(&b.user_id))
                });
                let similar = similar
                    .into_iter()
                    .map(|s| (s.user_id, s.similarity))
                    .collect();
                (user_id, similar)
            })
            .collect();

        let content_embeddings: HashMap<ContentId, Vec<f32>> = snapshot
            .content_embeddings
            .into_iter()
            .filter(|(id, _)| contents.contains_key(id))
            .collect();
        let (index_ids, index) = build_index(&content_embeddings)?;

        info!(
            contents = contents.len(),
            indexed = index_ids.len(),
            users = user_engagement.len(),
            "Loaded in-memory catalog"
        );

        Ok(Self {
            contents,
            counts,
            user_engagement,
            seen,
            blocked_authors,
            similar_users,
            user_embeddings: snapshot.user_embeddings,
            content_embeddings,
            index_ids,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

fn build_index(embeddings: &HashMap<ContentId, Vec<f32>>) -> Result<(Vec<ContentId>, Array2<f32>)> {
    let mut ids: Vec<ContentId> = embeddings.keys().copied().collect();
    ids.sort_unstable();

    let dim = match ids.first() {
        Some(first) => embeddings[first].len(),
        None => return Ok((ids, Array2::zeros((0, 0)))),
    };

    let mut flat = Vec::with_capacity(ids.len() * dim);
    for id in &ids {
        let vector = &embeddings[id];
        if vector.len() != dim {
            bail!(
                "Embedding for content {} has dimension {}, expected {}",
                id,
                vector.len(),
                dim
            );
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < f32::EPSILON {
            flat.extend(std::iter::repeat(0.0).take(dim));
        } else {
            flat.extend(vector.iter().map(|x| x / norm));
        }
    }

    let index = Array2::from_shape_vec((ids.len(), dim), flat)
        .context("Failed to build embedding matrix")?;
    Ok((ids, index))
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn all_content_ids(&self) -> Result<Vec<ContentId>> {
        Ok(self.contents.keys().copied().collect())
    }

    async fn get_contents(&self, ids: &[ContentId]) -> Result<HashMap<ContentId, ContentItem>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.contents.get(id).map(|item| (*id, item.clone())))
            .collect())
    }
}

#[async_trait]
impl EngagementStore for InMemoryStore {
    async fn engagement_counts(
        &self,
        ids: &[ContentId],
    ) -> Result<HashMap<ContentId, EngagementCounts>> {
        Ok(ids
            .iter()
            .map(|id| (*id, self.counts.get(id).copied().unwrap_or_default()))
            .collect())
    }

    async fn user_engagement(
        &self,
        user_id: UserId,
        ids: &[ContentId],
    ) -> Result<HashMap<ContentId, LikeDislike>> {
        let Some(engagements) = self.user_engagement.get(&user_id) else {
            return Ok(HashMap::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| engagements.get(id).map(|value| (*id, *value)))
            .collect())
    }

    async fn seen_content(&self, user_id: UserId) -> Result<HashSet<ContentId>> {
        Ok(self.seen.get(&user_id).cloned().unwrap_or_default())
    }

    async fn liked_content(&self, user_id: UserId) -> Result<Vec<ContentId>> {
        Ok(self
            .user_engagement
            .get(&user_id)
            .map(|engagements| {
                engagements
                    .iter()
                    .filter(|(_, value)| **value == LikeDislike::Like)
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn blocked_authors(&self, user_id: UserId) -> Result<HashSet<String>> {
        Ok(self.blocked_authors.get(&user_id).cloned().unwrap_or_default())
    }

    async fn similar_users(
        &self,
        user_id: UserId,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<(UserId, f64)>> {
        Ok(self
            .similar_users
            .get(&user_id)
            .map(|similar| {
                similar
                    .iter()
                    .filter(|(_, similarity)| *similarity >= min_similarity)
                    .take(limit)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn most_liked(&self, limit: usize) -> Result<Vec<(ContentId, u64)>> {
        let mut popularity: Vec<(ContentId, u64)> = self
            .contents
            .keys()
            .map(|id| (*id, self.counts.get(id).map(|c| c.likes).unwrap_or(0)))
            .collect();

        popularity.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        popularity.truncate(limit);
        Ok(popularity)
    }
}

#[async_trait]
impl EmbeddingIndex for InMemoryStore {
    async fn user_embedding(&self, user_id: UserId) -> Result<Option<Vec<f32>>> {
        Ok(self.user_embeddings.get(&user_id).cloned())
    }

    async fn content_embedding(&self, content_id: ContentId) -> Result<Option<Vec<f32>>> {
        Ok(self.content_embeddings.get(&content_id).cloned())
    }

    async fn nearest(
        &self,
        query: &[f32],
        k: usize,
        exclude: Option<ContentId>,
    ) -> Result<Vec<(ContentId, f64)>> {
        if self.index_ids.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let dim = self.index.ncols();
        if query.len() != dim {
            bail!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                dim
            );
        }

        let norm = query.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < f32::EPSILON {
            return Ok(Vec::new());
        }
        let query = Array1::from_iter(query.iter().map(|x| x / norm));
        let similarities = self.index.dot(&query);

        let mut scored: Vec<(ContentId, f64)> = self
            .index_ids
            .iter()
            .zip(similarities.iter())
            .filter(|(id, _)| Some(**id) != exclude)
            .map(|(id, similarity)| (*id, *similarity as f64))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }
}
