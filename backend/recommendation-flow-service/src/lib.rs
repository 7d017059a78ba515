pub mod config;
pub mod controllers;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use controllers::{Controller, ControllerKind, ControllerRegistry, PipelineContext, PipelineSettings};
pub use error::{PipelineError, RegistryError};
pub use models::{ContentId, RankedResult, RecommendationRequest, RequestConfig, TeamName, UserId};
pub use services::RecommendationService;
pub use utils::Seed;
