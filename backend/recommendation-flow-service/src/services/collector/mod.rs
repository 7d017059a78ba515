// ============================================
// Data Collector
// ============================================
// Request-scoped cache of per-(user, candidate) signals:
// - content metadata and like/dislike counts per candidate
// - the user's seen set, blocked authors and author affinity
//
// Owned by one controller invocation. `gather` takes `&mut self`; every
// later stage only gets `&DataCollector`, so the cache is read-only once
// gathering is done.
//
// A timed-out user signal is retried by the next `gather` and, until then,
// reported incomplete so the policy filter can refuse to vet against it.

use crate::error::{PipelineError, Result};
use crate::models::{ContentId, ContentItem, UserId};
use crate::store::{ContentStore, EngagementCounts, EngagementStore};
use crate::utils::{with_timeout, TimeoutError};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct DataCollector {
    content: Arc<dyn ContentStore>,
    engagement: Arc<dyn EngagementStore>,
    timeout: Duration,
    user_id: Option<UserId>,
    seen_complete: bool,
    blocked_complete: bool,
    liked_complete: bool,
    /// Candidate ids already looked up, including ones with no metadata
    fetched: HashSet<ContentId>,
    contents: HashMap<ContentId, ContentItem>,
    counts: HashMap<ContentId, EngagementCounts>,
    seen: HashSet<ContentId>,
    blocked_authors: HashSet<String>,
    author_affinity: HashMap<String, u32>,
}

impl DataCollector {
    pub fn new(
        content: Arc<dyn ContentStore>,
        engagement: Arc<dyn EngagementStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            content,
            engagement,
            timeout,
            user_id: None,
            seen_complete: false,
            blocked_complete: false,
            liked_complete: false,
            fetched: HashSet::new(),
            contents: HashMap::new(),
            counts: HashMap::new(),
            seen: HashSet::new(),
            blocked_authors: HashSet::new(),
            author_affinity: HashMap::new(),
        }
    }

    /// Load signals for `candidates`.
    ///
    /// User-level signals are loaded until every lookup has completed once;
    /// candidate-level signals are fetched for ids not seen by an earlier call.
    pub async fn gather(&mut self, user_id: UserId, candidates: &[ContentId]) -> Result<()> {
        if let Some(existing) = self.user_id {
            if existing != user_id {
                return Err(PipelineError::InvalidInput(format!(
                    "collector belongs to user {}, not {}",
                    existing, user_id
                )));
            }
        }
        if !self.user_signals_complete() {
            self.load_user_signals(user_id).await?;
        }
        self.user_id = Some(user_id);

        let mut pending: Vec<ContentId> = Vec::new();
        let mut queued: HashSet<ContentId> = HashSet::new();
        for id in candidates {
            if !self.fetched.contains(id) && queued.insert(*id) {
                pending.push(*id);
            }
        }

        if pending.is_empty() {
            debug!(user_id, candidates = candidates.len(), "All candidate signals cached");
            return Ok(());
        }

        let (contents, counts) = tokio::join!(
            bounded(self.timeout, "content_metadata", self.content.get_contents(&pending)),
            bounded(self.timeout, "engagement_counts", self.engagement.engagement_counts(&pending)),
        );
        let (contents, contents_complete) = contents?;
        let (counts, counts_complete) = counts?;

        self.contents.extend(contents);
        self.counts.extend(counts);
        // A timed-out lookup leaves its ids eligible for a later gather
        if contents_complete && counts_complete {
            self.fetched.extend(pending.iter().copied());
        }

        debug!(
            user_id,
            fetched = pending.len(),
            known_contents = self.contents.len(),
            "Candidate signals gathered"
        );

        Ok(())
    }

    /// Load whichever user signals are still missing.
    async fn load_user_signals(&mut self, user_id: UserId) -> Result<()> {
        let (seen, blocked, liked) = tokio::join!(
            bounded_if(!self.seen_complete, self.timeout, "seen_content", || {
                self.engagement.seen_content(user_id)
            }),
            bounded_if(!self.blocked_complete, self.timeout, "blocked_authors", || {
                self.engagement.blocked_authors(user_id)
            }),
            bounded_if(!self.liked_complete, self.timeout, "liked_content", || {
                self.engagement.liked_content(user_id)
            }),
        );

        if let Some((seen, complete)) = seen? {
            self.seen = seen;
            self.seen_complete = complete;
        }
        if let Some((blocked, complete)) = blocked? {
            self.blocked_authors = blocked;
            self.blocked_complete = complete;
        }
        if let Some((liked, complete)) = liked? {
            let (liked_items, items_complete) = bounded(
                self.timeout,
                "liked_metadata",
                self.content.get_contents(&liked),
            )
            .await?;

            let mut affinity: HashMap<String, u32> = HashMap::new();
            for item in liked_items.into_values() {
                *affinity.entry(item.author).or_default() += 1;
            }
            self.author_affinity = affinity;
            self.liked_complete = complete && items_complete;
        }

        if !self.user_signals_complete() {
            warn!(
                user_id,
                seen = self.seen_complete,
                blocked_authors = self.blocked_complete,
                liked = self.liked_complete,
                "User signals incomplete, will retry on next gather"
            );
        }
        Ok(())
    }

    fn user_signals_complete(&self) -> bool {
        self.seen_complete && self.blocked_complete && self.liked_complete
    }

    /// False while the seen-content lookup has not completed.
    pub fn seen_complete(&self) -> bool {
        self.seen_complete
    }

    /// False while the blocked-authors lookup has not completed.
    pub fn blocked_authors_complete(&self) -> bool {
        self.blocked_complete
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn content(&self, id: ContentId) -> Option<&ContentItem> {
        self.contents.get(&id)
    }

    pub fn counts(&self, id: ContentId) -> EngagementCounts {
        self.counts.get(&id).copied().unwrap_or_default()
    }

    pub fn has_seen(&self, id: ContentId) -> bool {
        self.seen.contains(&id)
    }

    pub fn is_blocked_author(&self, author: &str) -> bool {
        self.blocked_authors.contains(author)
    }

    /// Number of the author's items the user liked.
    pub fn author_affinity(&self, author: &str) -> u32 {
        self.author_affinity.get(author).copied().unwrap_or(0)
    }
}

/// `bounded`, skipped with `None` when the signal is already loaded.
async fn bounded_if<T, F, L>(
    needed: bool,
    timeout: Duration,
    signal: &'static str,
    lookup: L,
) -> Result<Option<(T, bool)>>
where
    T: Default,
    F: Future<Output = anyhow::Result<T>>,
    L: FnOnce() -> F,
{
    if !needed {
        return Ok(None);
    }
    bounded(timeout, signal, lookup()).await.map(Some)
}

/// Run one store lookup under the collector timeout.
///
/// A timeout yields the default value and `false`; any other error fails the
/// invocation.
async fn bounded<T, F>(timeout: Duration, signal: &'static str, future: F) -> Result<(T, bool)>
where
    T: Default,
    F: Future<Output = anyhow::Result<T>>,
{
    match with_timeout(timeout, future).await {
        Ok(Ok(value)) => Ok((value, true)),
        Ok(Err(e)) => Err(PipelineError::failure(
            "collector",
            e.context(format!("{} lookup failed", signal)),
        )),
        Err(TimeoutError::Elapsed(elapsed)) => {
            let err = PipelineError::UpstreamTimeout {
                stage: signal,
                elapsed,
            };
            warn!(error = %err, "Collector signal timed out, using empty value");
            Ok((T::default(), false))
        }
        Err(TimeoutError::OperationFailed(message)) => Err(PipelineError::Failure {
            stage: "collector",
            trace: vec![message.clone()],
            message,
        }),
    }
}
