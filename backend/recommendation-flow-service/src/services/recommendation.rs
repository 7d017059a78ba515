// ============================================
// Recommendation Service
// ============================================
//
// Entry point for one request: validate, resolve the controller, run its
// pipeline inside a tracing span, and record the outcome.

use crate::controllers::{ControllerRegistry, PipelineContext};
use crate::error::{PipelineError, Result};
use crate::metrics;
use crate::models::{PipelineRequest, RankedResult, RecommendationRequest};
use crate::utils::Seed;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};

pub struct RecommendationService {
    registry: ControllerRegistry,
}

impl RecommendationService {
    pub fn new(context: &PipelineContext) -> Self {
        Self {
            registry: ControllerRegistry::new(context),
        }
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub fn list_controllers(&self) -> Vec<&'static str> {
        ControllerRegistry::list()
    }

    /// Run one request end to end.
    ///
    /// The seed is normalized here and nowhere else. Unknown controller names
    /// fall back to the default; only invalid input and stage failures are
    /// returned as errors.
    pub async fn recommend(&self, request: RecommendationRequest) -> Result<RankedResult> {
        let controller = self.registry.resolve(request.controller.as_deref());
        let name = controller.name();

        let pipeline_request = match Self::validate(&request) {
            Ok(pipeline_request) => pipeline_request,
            Err(err) => {
                metrics::record_request(name, "error");
                return Err(err);
            }
        };

        let span = info_span!(
            "recommend",
            controller = name,
            team = controller.team().as_str(),
            user_id = request.user_id
        );

        async move {
            let started = Instant::now();
            let result = controller.get_content_ids(&pipeline_request).await;

            match &result {
                Ok(ranked) => {
                    metrics::record_request(name, "ok");
                    metrics::record_result_size(name, ranked.len());
                    info!(
                        results = ranked.len(),
                        limit = pipeline_request.limit,
                        offset = pipeline_request.offset,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Recommendation completed"
                    );
                }
                Err(err) => {
                    metrics::record_request(name, "error");
                    error!(error = %err, "Recommendation failed");
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    fn validate(request: &RecommendationRequest) -> Result<PipelineRequest> {
        if request.limit == 0 {
            return Err(PipelineError::InvalidInput("limit must be positive".to_string()));
        }
        if !request.seed.is_finite() {
            return Err(PipelineError::InvalidInput(format!(
                "seed must be finite, got {}",
                request.seed
            )));
        }

        Ok(PipelineRequest {
            user_id: request.user_id,
            limit: request.limit,
            offset: request.offset(),
            seed: Seed::normalize(request.seed),
            config: request.config.clone(),
        })
    }
}
