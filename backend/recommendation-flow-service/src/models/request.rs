use super::{ContentId, UserId, ANONYMOUS_USER};
use crate::utils::Seed;
use serde::{Deserialize, Serialize};

/// Bumped whenever a flag is added, removed or changes meaning.
pub const REQUEST_CONFIG_VERSION: u32 = 1;

/// Per-request flag set ("starting point").
///
/// Built once by the adapter and never mutated while the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub version: u32,
    /// Two-tower embedding retrieval.
    pub two_tower: bool,
    /// Similar-users collaborative retrieval.
    pub collab_filter: bool,
    /// Anchor/example retrieval.
    pub your_choice: bool,
    /// Drop content the user already saw.
    pub policy_filter_one: bool,
    /// Drop flagged content and blocked authors.
    pub policy_filter_two: bool,
    pub linear_model: bool,
    pub inverse_filter: bool,
    pub random_predictions: bool,
    pub inverse_ranker: bool,
    pub anchor_content_id: Option<ContentId>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            version: REQUEST_CONFIG_VERSION,
            two_tower: true,
            collab_filter: true,
            your_choice: true,
            policy_filter_one: true,
            policy_filter_two: true,
            linear_model: true,
            inverse_filter: false,
            random_predictions: false,
            inverse_ranker: false,
            anchor_content_id: None,
        }
    }
}

impl RequestConfig {
    /// All generators, filters and model switches off.
    pub fn disabled() -> Self {
        Self {
            two_tower: false,
            collab_filter: false,
            your_choice: false,
            policy_filter_one: false,
            policy_filter_two: false,
            linear_model: false,
            ..Self::default()
        }
    }

    pub fn with_anchor(mut self, content_id: ContentId) -> Self {
        self.anchor_content_id = Some(content_id);
        self
    }
}

/// A fully decoded inbound request, before validation and seed normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    /// Controller name; `None` or empty resolves to the default controller.
    pub controller: Option<String>,
    pub user_id: UserId,
    pub page: u32,
    pub limit: usize,
    pub seed: f64,
    pub config: RequestConfig,
}

impl RecommendationRequest {
    pub fn new(user_id: UserId, limit: usize, seed: f64) -> Self {
        Self {
            controller: None,
            user_id,
            page: 0,
            limit,
            seed,
            config: RequestConfig::default(),
        }
    }

    pub fn anonymous(limit: usize, seed: f64) -> Self {
        Self::new(ANONYMOUS_USER, limit, seed)
    }

    pub fn with_controller(mut self, name: impl Into<String>) -> Self {
        self.controller = Some(name.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn offset(&self) -> usize {
        self.page as usize * self.limit
    }
}

/// What a controller receives: validated, offset resolved, seed normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub user_id: UserId,
    pub limit: usize,
    pub offset: usize,
    pub seed: Seed,
    pub config: RequestConfig,
}
