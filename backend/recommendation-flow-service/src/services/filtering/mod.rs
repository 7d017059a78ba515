mod policy_filter;
mod random_filter;

pub use policy_filter::PolicyFilter;
pub use random_filter::RandomFilter;

use crate::error::Result;
use crate::models::{ContentId, RequestConfig, TeamName, UserId};
use crate::services::collector::DataCollector;
use crate::utils::Seed;

/// Extra input a filter works from: a statistical drop fraction, or the
/// request's collected signals for content-aware exclusion.
#[derive(Clone, Copy)]
pub enum FilterInput<'a> {
    Amount(f64),
    Collector(&'a DataCollector),
}

/// Narrows the candidate pool.
///
/// Output is an ordered subsequence of `candidates`: never longer, never
/// reordered, and deterministic for a fixed seed and collector.
pub trait CandidateFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn filter_ids(
        &self,
        team: TeamName,
        user_id: UserId,
        candidates: &[ContentId],
        seed: Seed,
        config: &RequestConfig,
        input: FilterInput<'_>,
    ) -> Result<Vec<ContentId>>;
}
