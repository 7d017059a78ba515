mod request;

pub use request::{PipelineRequest, RecommendationRequest, RequestConfig, REQUEST_CONFIG_VERSION};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ContentId = i64;
pub type UserId = i64;

/// Logged-out callers are mapped to this id. It is never a real account.
pub const ANONYMOUS_USER: UserId = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub author: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub original_prompt: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Set by trust & safety review; policy filters exclude flagged items.
    #[serde(default)]
    pub flagged: bool,
}

/// Experiment arm label carried through every stage for instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamName {
    Random,
    FoxtrotF2023,
}

impl TeamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamName::Random => "random",
            TeamName::FoxtrotF2023 => "foxtrot_f2023",
        }
    }
}

/// Output of a single generator call: ordered ids plus optional parallel scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedCandidates {
    pub ids: Vec<ContentId>,
    pub scores: Option<Vec<f64>>,
}

impl GeneratedCandidates {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn unscored(ids: Vec<ContentId>) -> Self {
        Self { ids, scores: None }
    }

    pub fn scored(ids: Vec<ContentId>, scores: Vec<f64>) -> Self {
        Self {
            ids,
            scores: Some(scores),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Fan-in result of one or more generators.
///
/// Generator outputs are appended in call order and never deduplicated, so the
/// same id may appear more than once. `scores` is always parallel to `ids`;
/// unscored generators contribute 0.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    pub ids: Vec<ContentId>,
    pub scores: Vec<f64>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, generated: GeneratedCandidates) {
        let count = generated.ids.len();
        let scores = generated.scores.unwrap_or_default();

        self.scores.extend(
            scores
                .into_iter()
                .chain(std::iter::repeat(0.0))
                .take(count),
        );
        self.ids.extend(generated.ids);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Score lookup handed to models. For duplicated ids the last occurrence wins.
    pub fn upstream_scores(&self) -> UpstreamScores {
        self.ids
            .iter()
            .copied()
            .zip(self.scores.iter().copied())
            .collect()
    }
}

pub type UpstreamScores = HashMap<ContentId, f64>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionScore {
    pub score: f64,
    pub upstream_score: f64,
}

/// Model output: one entry per candidate id.
pub type Prediction = HashMap<ContentId, PredictionScore>;

/// Final ordered ids, at most `limit` long.
pub type RankedResult = Vec<ContentId>;
