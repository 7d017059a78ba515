/// Prediction Module
///
/// Scores filtered candidates for ranking.
///
/// # Models
/// - **RandomModel**: i.i.d. uniform scores; the control arm and the forced
///   fallback when random predictions are requested
/// - **LinearModel**: logistic model over the feature matrix blended with
///   the upstream generator score
///
/// Every model returns exactly one entry per distinct candidate id. Dropping
/// candidates is the ranker's job, never the model's.
mod linear_model;
mod random_model;

pub use linear_model::{LinearModel, LinearModelWeights};
pub use random_model::RandomModel;

use crate::error::Result;
use crate::models::{ContentId, Prediction, TeamName, UpstreamScores, UserId};
use crate::services::features::FeatureMatrix;
use crate::utils::Seed;

pub trait PredictionModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// `scores` holds upstream generator scores (absent ids count as 0).
    /// `features`, when present, is row-aligned with `candidates`.
    fn predict_probabilities(
        &self,
        team: TeamName,
        candidates: &[ContentId],
        user_id: UserId,
        seed: Seed,
        scores: &UpstreamScores,
        features: Option<&FeatureMatrix>,
    ) -> Result<Prediction>;
}
