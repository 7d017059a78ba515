use crate::models::{ContentId, UserId};
use crate::store::{ContentStore, EngagementStore, LikeDislike};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

/// One ranked item as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentResponse {
    pub id: ContentId,
    pub total_likes: u64,
    pub total_dislikes: u64,
    pub user_likes: bool,
    pub user_dislikes: bool,
    /// Falls back to the author when the item has no text
    pub text: String,
    pub original_prompt: Option<String>,
    pub style: Option<String>,
    pub prompt: Option<String>,
    pub author: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url: Option<String>,
    pub download_url: Option<String>,
}

/// Joins metadata and engagement onto a ranked result after the pipeline ran.
pub struct Enricher {
    content: Arc<dyn ContentStore>,
    engagement: Arc<dyn EngagementStore>,
}

impl Enricher {
    pub fn new(content: Arc<dyn ContentStore>, engagement: Arc<dyn EngagementStore>) -> Self {
        Self {
            content,
            engagement,
        }
    }

    /// Responses in ranked order; ids without metadata are skipped.
    pub async fn enrich(&self, user_id: UserId, ranked: &[ContentId]) -> Result<Vec<ContentResponse>> {
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let (contents, counts, user_state) = tokio::try_join!(
            self.content.get_contents(ranked),
            self.engagement.engagement_counts(ranked),
            self.engagement.user_engagement(user_id, ranked),
        )
        .context("Failed to load content for response")?;

        Ok(ranked
            .iter()
            .filter_map(|id| {
                let item = contents.get(id)?.clone();
                let counts = counts.get(id).copied().unwrap_or_default();
                let state = user_state.get(id).copied();

                Some(ContentResponse {
                    id: item.id,
                    total_likes: counts.likes,
                    total_dislikes: counts.dislikes,
                    user_likes: state == Some(LikeDislike::Like),
                    user_dislikes: state == Some(LikeDislike::Dislike),
                    text: item.text.unwrap_or_else(|| item.author.clone()),
                    original_prompt: item.original_prompt,
                    style: item.style,
                    prompt: item.prompt,
                    author: item.author,
                    width: item.width,
                    height: item.height,
                    url: item.url,
                    download_url: item.download_url,
                })
            })
            .collect())
    }
}
