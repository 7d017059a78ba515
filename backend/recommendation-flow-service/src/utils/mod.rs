// Utility functions for the recommendation pipeline

mod seed;
mod timeout;

pub use seed::{Seed, SEED_SCALE};
pub use timeout::{with_timeout, with_timeout_result, TimeoutError};

/// Normalize a score to [0, 1] range
pub fn normalize_score(score: f64, min: f64, max: f64) -> f64 {
    if max - min < f64::EPSILON {
        0.5
    } else {
        ((score - min) / (max - min)).clamp(0.0, 1.0)
    }
}

/// Logistic squash into (0, 1)
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
