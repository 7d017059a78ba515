mod collaborative;
mod example;
mod random;
mod two_tower;

pub use collaborative::CollaborativeFilteredSimilarUsersGenerator;
pub use example::ExampleGenerator;
pub use random::RandomGenerator;
pub use two_tower::TwoTowerAnnGenerator;

use crate::error::PipelineError;
use crate::metrics;
use crate::models::{CandidatePool, GeneratedCandidates, PipelineRequest, RequestConfig, TeamName, UserId};
use crate::utils::{with_timeout_result, Seed, TimeoutError};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Candidate generation strategy.
///
/// `limit` bounds the attempt size and `offset` continues a page without
/// reseeding. Generators only read from stores and never apply policy
/// filtering; that is the filter stage's job.
#[async_trait]
pub trait CandidateGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_content_ids(
        &self,
        team: TeamName,
        user_id: UserId,
        limit: usize,
        offset: usize,
        seed: Seed,
        config: &RequestConfig,
    ) -> Result<GeneratedCandidates>;
}

/// Run every generator concurrently and concatenate their outputs.
///
/// Outputs are appended in the order of `generators`, whatever order the
/// calls finish in. A generator that fails or exceeds `timeout` contributes
/// nothing; the others still count. If every generator returned an error
/// (timeouts excluded) the whole stage fails.
pub async fn fan_in(
    generators: &[Arc<dyn CandidateGenerator>],
    team: TeamName,
    request: &PipelineRequest,
    limit: usize,
    timeout: Duration,
) -> crate::error::Result<CandidatePool> {
    let calls = generators.iter().map(|generator| async move {
        let started = Instant::now();
        let outcome = with_timeout_result(
            timeout,
            generator.get_content_ids(
                team,
                request.user_id,
                limit,
                request.offset,
                request.seed,
                &request.config,
            ),
        )
        .await;
        (generator.name(), outcome, started.elapsed())
    });

    let mut pool = CandidatePool::new();
    let mut errors: Vec<String> = Vec::new();
    for (name, outcome, elapsed) in join_all(calls).await {
        match outcome {
            Ok(generated) => {
                debug!(
                    team = team.as_str(),
                    generator = name,
                    candidates = generated.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Generator completed"
                );
                metrics::record_generator_outcome(team, name, "ok");
                pool.push(generated);
            }
            Err(TimeoutError::Elapsed(budget)) => {
                let err = PipelineError::UpstreamTimeout {
                    stage: name,
                    elapsed: budget,
                };
                warn!(team = team.as_str(), generator = name, error = %err, "Generator timed out, treating as empty");
                metrics::record_generator_outcome(team, name, "timeout");
            }
            Err(TimeoutError::OperationFailed(message)) => {
                warn!(team = team.as_str(), generator = name, error = %message, "Generator failed, treating as empty");
                metrics::record_generator_outcome(team, name, "error");
                errors.push(format!("{}: {}", name, message));
            }
        }
    }

    if !generators.is_empty() && errors.len() == generators.len() {
        return Err(PipelineError::Failure {
            stage: "generate",
            message: format!("all {} generators failed", errors.len()),
            trace: errors,
        });
    }

    Ok(pool)
}
