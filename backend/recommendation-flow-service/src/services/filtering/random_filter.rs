use super::{CandidateFilter, FilterInput};
use crate::error::{PipelineError, Result};
use crate::models::{ContentId, RequestConfig, TeamName, UserId};
use crate::utils::Seed;
use rand::Rng;
use tracing::debug;

/// Drops each candidate independently with probability `amount`.
pub struct RandomFilter;

impl CandidateFilter for RandomFilter {
    fn name(&self) -> &'static str {
        "random_filter"
    }

    fn filter_ids(
        &self,
        team: TeamName,
        user_id: UserId,
        candidates: &[ContentId],
        seed: Seed,
        _config: &RequestConfig,
        input: FilterInput<'_>,
    ) -> Result<Vec<ContentId>> {
        let FilterInput::Amount(amount) = input else {
            return Err(PipelineError::InvalidInput(
                "random filter needs a drop amount".to_string(),
            ));
        };
        if !(amount > 0.0 && amount <= 1.0) {
            return Err(PipelineError::InvalidInput(format!(
                "filter amount must be in (0, 1], got {}",
                amount
            )));
        }

        let mut rng = seed.rng("filter:random");
        let kept: Vec<ContentId> = candidates
            .iter()
            .copied()
            .filter(|_| rng.gen::<f64>() >= amount)
            .collect();

        debug!(
            team = team.as_str(),
            user_id,
            input = candidates.len(),
            kept = kept.len(),
            "Random filter applied"
        );

        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(candidates: &[ContentId], seed: f64, amount: f64) -> Result<Vec<ContentId>> {
        RandomFilter.filter_ids(
            TeamName::Random,
            0,
            candidates,
            Seed::normalize(seed),
            &RequestConfig::default(),
            FilterInput::Amount(amount),
        )
    }

    #[test]
    fn test_keeps_roughly_ninety_percent() {
        let candidates: Vec<ContentId> = (0..10_000).collect();
        let kept = filter(&candidates, 0.5, 0.1).unwrap();

        let ratio = kept.len() as f64 / candidates.len() as f64;
        assert!((0.87..=0.93).contains(&ratio), "kept ratio {}", ratio);
    }

    #[test]
    fn test_preserves_relative_order() {
        let candidates: Vec<ContentId> = (0..500).rev().collect();
        let kept = filter(&candidates, 0.3, 0.1).unwrap();

        assert!(kept.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_is_deterministic() {
        let candidates: Vec<ContentId> = (0..200).collect();
        assert_eq!(filter(&candidates, 0.3, 0.1).unwrap(), filter(&candidates, 0.3, 0.1).unwrap());
    }

    #[test]
    fn test_full_drop_and_empty_input() {
        let candidates: Vec<ContentId> = (0..50).collect();
        assert!(filter(&candidates, 0.3, 1.0).unwrap().is_empty());
        assert!(filter(&[], 0.3, 0.1).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_out_of_range_amount() {
        assert!(matches!(filter(&[1, 2], 0.3, 0.0), Err(PipelineError::InvalidInput(_))));
        assert!(matches!(filter(&[1, 2], 0.3, 1.5), Err(PipelineError::InvalidInput(_))));
        assert!(matches!(filter(&[1, 2], 0.3, f64::NAN), Err(PipelineError::InvalidInput(_))));
    }
}
