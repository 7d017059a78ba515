pub mod collector;
pub mod features;
pub mod filtering;
pub mod generators;
pub mod prediction;
pub mod ranking;
pub mod recommendation;

pub use collector::DataCollector;
pub use features::{FeatureGenerator, FeatureMatrix};
pub use recommendation::RecommendationService;
