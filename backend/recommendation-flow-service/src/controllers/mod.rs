// ============================================
// Controllers
// ============================================
//
// A controller is one experiment arm: a fixed composition of
// generator -> filter -> model -> ranker run for a single request.
//
// 1. Random  - control arm, one shuffled generator and a statistical filter
// 2. Foxtrot - flag-gated fan-in over three generators with policy
//              filtering, features and a trained model
//
// Controllers are looked up by name through `ControllerRegistry`; unknown
// names fall back to the default arm instead of failing the request.

mod foxtrot;
mod random;

pub use foxtrot::FoxtrotController;
pub use random::RandomController;

use crate::error::{RegistryError, Result};
use crate::models::{PipelineRequest, RankedResult, TeamName};
use crate::services::prediction::LinearModelWeights;
use crate::store::Stores;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[async_trait]
pub trait Controller: Send + Sync {
    fn kind(&self) -> ControllerKind;

    fn team(&self) -> TeamName;

    fn name(&self) -> &'static str {
        self.kind().human_string()
    }

    /// Run the whole pipeline. An empty result is a valid outcome.
    async fn get_content_ids(&self, request: &PipelineRequest) -> Result<RankedResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    Random,
    Foxtrot,
}

impl ControllerKind {
    pub const ALL: [ControllerKind; 2] = [ControllerKind::Random, ControllerKind::Foxtrot];

    pub const DEFAULT: ControllerKind = ControllerKind::Random;

    pub fn human_string(&self) -> &'static str {
        match self {
            ControllerKind::Random => "Random",
            ControllerKind::Foxtrot => "Foxtrot",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> std::result::Result<Self, RegistryError> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.human_string().eq_ignore_ascii_case(name))
            .ok_or_else(|| RegistryError::UnknownController(name.to_string()))
    }
}

/// Tunables shared by every controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub generator_timeout: Duration,
    pub collector_timeout: Duration,
    /// Random arm over-fetch factor so enough candidates survive the filter
    pub random_candidate_multiplier: usize,
    pub random_filter_amount: f64,
    /// Candidates requested from each Foxtrot generator
    pub foxtrot_candidate_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            generator_timeout: Duration::from_millis(500),
            collector_timeout: Duration::from_millis(500),
            random_candidate_multiplier: 100,
            random_filter_amount: 0.1,
            foxtrot_candidate_limit: 100,
        }
    }
}

/// Process-wide, read-only dependencies handed to every controller.
#[derive(Clone)]
pub struct PipelineContext {
    pub stores: Stores,
    pub settings: PipelineSettings,
    pub linear_weights: Arc<LinearModelWeights>,
}

impl PipelineContext {
    pub fn new(stores: Stores, settings: PipelineSettings, linear_weights: LinearModelWeights) -> Self {
        Self {
            stores,
            settings,
            linear_weights: Arc::new(linear_weights),
        }
    }
}

/// Name -> controller table, built once at startup.
pub struct ControllerRegistry {
    random: Arc<dyn Controller>,
    foxtrot: Arc<dyn Controller>,
}

impl ControllerRegistry {
    pub fn new(context: &PipelineContext) -> Self {
        Self {
            random: Arc::new(RandomController::new(context)),
            foxtrot: Arc::new(FoxtrotController::new(context)),
        }
    }

    /// Every registered controller name.
    pub fn list() -> Vec<&'static str> {
        ControllerKind::ALL.iter().map(|kind| kind.human_string()).collect()
    }

    pub fn get(&self, kind: ControllerKind) -> Arc<dyn Controller> {
        match kind {
            ControllerKind::Random => self.random.clone(),
            ControllerKind::Foxtrot => self.foxtrot.clone(),
        }
    }

    pub fn try_resolve(&self, name: &str) -> std::result::Result<Arc<dyn Controller>, RegistryError> {
        ControllerKind::from_name(name).map(|kind| self.get(kind))
    }

    /// Resolve `name`, falling back to the default controller when it is
    /// missing or unknown.
    pub fn resolve(&self, name: Option<&str>) -> Arc<dyn Controller> {
        let Some(name) = name else {
            return self.get(ControllerKind::DEFAULT);
        };

        self.try_resolve(name).unwrap_or_else(|err| {
            warn!(error = %err, "Falling back to default controller");
            self.get(ControllerKind::DEFAULT)
        })
    }
}
