use super::{CandidateFilter, FilterInput};
use crate::error::{PipelineError, Result};
use crate::models::{ContentId, RequestConfig, TeamName, UserId};
use crate::services::collector::DataCollector;
use crate::utils::Seed;
use tracing::{debug, warn};

/// Content-aware exclusion driven by the request's collected signals.
///
/// - `policy_filter_one`: drop content the user already saw or engaged with
/// - `policy_filter_two`: drop flagged content and blocked authors
/// - `inverse_filter`: keep only what the enabled policies would drop
///
/// Ids the collector holds no metadata for are dropped in every mode, and so
/// is everything an enabled policy cannot vet because its signal timed out.
pub struct PolicyFilter;

impl PolicyFilter {
    /// An enabled policy whose signal timed out during gathering.
    fn signals_missing(collector: &DataCollector, config: &RequestConfig) -> bool {
        (config.policy_filter_one && !collector.seen_complete())
            || (config.policy_filter_two && !collector.blocked_authors_complete())
    }

    fn excluded(collector: &DataCollector, config: &RequestConfig, id: ContentId) -> Option<bool> {
        if Self::signals_missing(collector, config) {
            return None;
        }
        let item = collector.content(id)?;

        let seen = config.policy_filter_one && collector.has_seen(id);
        let unsafe_content = config.policy_filter_two
            && (item.flagged || collector.is_blocked_author(&item.author));

        Some(seen || unsafe_content)
    }
}

impl CandidateFilter for PolicyFilter {
    fn name(&self) -> &'static str {
        "policy_filter"
    }

    fn filter_ids(
        &self,
        team: TeamName,
        user_id: UserId,
        candidates: &[ContentId],
        _seed: Seed,
        config: &RequestConfig,
        input: FilterInput<'_>,
    ) -> Result<Vec<ContentId>> {
        let FilterInput::Collector(collector) = input else {
            return Err(PipelineError::InvalidInput(
                "policy filter needs a data collector".to_string(),
            ));
        };
        if collector.user_id() != Some(user_id) {
            return Err(PipelineError::InvalidInput(format!(
                "collector was gathered for {:?}, not user {}",
                collector.user_id(),
                user_id
            )));
        }

        if Self::signals_missing(collector, config) {
            warn!(
                team = team.as_str(),
                user_id,
                dropped = candidates.len(),
                "Policy signals incomplete, dropping unvetted candidates"
            );
        }

        let kept: Vec<ContentId> = candidates
            .iter()
            .copied()
            .filter(|id| Self::excluded(collector, config, *id) == Some(config.inverse_filter))
            .collect();

        debug!(
            team = team.as_str(),
            user_id,
            input = candidates.len(),
            kept = kept.len(),
            inverse = config.inverse_filter,
            "Policy filter applied"
        );

        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{self, SlowEngagementStore, ACTIVE_USER};
    use std::sync::Arc;
    use std::time::Duration;

    // 4 is by a blocked author, 13 is flagged, 20 was liked, 22 was viewed,
    // 999 does not exist
    const CANDIDATES: [ContentId; 7] = [1, 4, 13, 20, 22, 25, 999];

    async fn collector() -> DataCollector {
        let store = fixtures::memory_store();
        let mut collector = DataCollector::new(store.clone(), store, Duration::from_secs(1));
        collector.gather(ACTIVE_USER, &CANDIDATES).await.unwrap();
        collector
    }

    fn filter(collector: &DataCollector, config: &RequestConfig) -> Result<Vec<ContentId>> {
        PolicyFilter.filter_ids(
            TeamName::FoxtrotF2023,
            ACTIVE_USER,
            &CANDIDATES,
            Seed::normalize(0.5),
            config,
            FilterInput::Collector(collector),
        )
    }

    #[tokio::test]
    async fn test_default_policies() {
        let collector = collector().await;
        assert_eq!(filter(&collector, &RequestConfig::default()).unwrap(), vec![1, 25]);
    }

    #[tokio::test]
    async fn test_inverse_keeps_excluded_only() {
        let collector = collector().await;
        let config = RequestConfig {
            inverse_filter: true,
            ..RequestConfig::default()
        };

        assert_eq!(filter(&collector, &config).unwrap(), vec![4, 13, 20, 22]);
    }

    #[tokio::test]
    async fn test_seen_policy_alone() {
        let collector = collector().await;
        let config = RequestConfig {
            policy_filter_two: false,
            ..RequestConfig::default()
        };

        assert_eq!(filter(&collector, &config).unwrap(), vec![1, 4, 13, 25]);
    }

    #[tokio::test]
    async fn test_policies_off_still_drops_unknown_content() {
        let collector = collector().await;
        let config = RequestConfig {
            policy_filter_one: false,
            policy_filter_two: false,
            ..RequestConfig::default()
        };

        assert_eq!(filter(&collector, &config).unwrap(), vec![1, 4, 13, 20, 22, 25]);
    }

    #[tokio::test]
    async fn test_requires_collector_for_same_user() {
        let collector = collector().await;

        let wrong_input = PolicyFilter.filter_ids(
            TeamName::FoxtrotF2023,
            ACTIVE_USER,
            &CANDIDATES,
            Seed::normalize(0.5),
            &RequestConfig::default(),
            FilterInput::Amount(0.1),
        );
        assert!(matches!(wrong_input, Err(PipelineError::InvalidInput(_))));

        let wrong_user = PolicyFilter.filter_ids(
            TeamName::FoxtrotF2023,
            2,
            &CANDIDATES,
            Seed::normalize(0.5),
            &RequestConfig::default(),
            FilterInput::Collector(&collector),
        );
        assert!(matches!(wrong_user, Err(PipelineError::InvalidInput(_))));
    }

    async fn collector_with_slow(signal: &'static str) -> DataCollector {
        let mut collector = DataCollector::new(
            fixtures::memory_store(),
            Arc::new(SlowEngagementStore::new(signal, Duration::from_millis(200), 1)),
            Duration::from_millis(20),
        );
        collector.gather(ACTIVE_USER, &CANDIDATES).await.unwrap();
        collector
    }

    #[tokio::test]
    async fn test_timed_out_blocked_authors_drop_everything() {
        let collector = collector_with_slow("blocked_authors").await;

        assert!(filter(&collector, &RequestConfig::default()).unwrap().is_empty());

        let inverse = RequestConfig {
            inverse_filter: true,
            ..RequestConfig::default()
        };
        assert!(filter(&collector, &inverse).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_signal_only_matters_when_its_policy_is_on() {
        let collector = collector_with_slow("blocked_authors").await;
        let config = RequestConfig {
            policy_filter_two: false,
            ..RequestConfig::default()
        };

        assert_eq!(filter(&collector, &config).unwrap(), vec![1, 4, 13, 25]);
    }

    #[tokio::test]
    async fn test_retried_blocked_authors_restore_filtering() {
        let mut collector = collector_with_slow("blocked_authors").await;
        collector.gather(ACTIVE_USER, &CANDIDATES).await.unwrap();

        assert_eq!(filter(&collector, &RequestConfig::default()).unwrap(), vec![1, 25]);
    }
}
