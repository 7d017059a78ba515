// ============================================
// Feature Generation
// ============================================
// Derives one fixed-width vector per filtered candidate from the
// collector's signals. Pure: same collector contents and candidate order
// always give the same matrix.

use crate::models::ContentId;
use crate::services::collector::DataCollector;
use ndarray::{Array2, ArrayView1};

/// Columns of the feature matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    LogLikes = 0,
    LogDislikes = 1,
    /// (likes + 1) / (likes + dislikes + 2)
    LikeRatio = 2,
    Seen = 3,
    AuthorAffinity = 4,
    AspectRatio = 5,
    PromptLength = 6,
    Bias = 7,
}

pub const FEATURE_WIDTH: usize = 8;

/// Feature vectors aligned row-for-row with a candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    ids: Vec<ContentId>,
    values: Array2<f32>,
}

impl FeatureMatrix {
    pub fn ids(&self) -> &[ContentId] {
        &self.ids
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.values.row(index)
    }

    pub fn get(&self, index: usize, feature: Feature) -> f32 {
        self.values[[index, feature as usize]]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }
}

pub struct FeatureGenerator {
    matrix: FeatureMatrix,
}

impl FeatureGenerator {
    pub fn new(collector: &DataCollector, candidates: &[ContentId]) -> Self {
        let mut values = Array2::<f32>::zeros((candidates.len(), FEATURE_WIDTH));

        for (row, id) in candidates.iter().enumerate() {
            let vector = Self::vector(collector, *id);
            values.row_mut(row).assign(&ArrayView1::from(&vector[..]));
        }

        Self {
            matrix: FeatureMatrix {
                ids: candidates.to_vec(),
                values,
            },
        }
    }

    fn vector(collector: &DataCollector, id: ContentId) -> [f32; FEATURE_WIDTH] {
        let counts = collector.counts(id);
        let likes = counts.likes as f32;
        let dislikes = counts.dislikes as f32;

        let (affinity, aspect_ratio, prompt_chars) = match collector.content(id) {
            Some(item) => {
                let aspect = match (item.width, item.height) {
                    (Some(w), Some(h)) if h > 0 => w as f32 / h as f32,
                    _ => 1.0,
                };
                let prompt_chars = item.prompt.as_deref().map_or(0, |p| p.chars().count());
                (collector.author_affinity(&item.author), aspect, prompt_chars)
            }
            None => (0, 1.0, 0),
        };

        let mut vector = [0.0; FEATURE_WIDTH];
        vector[Feature::LogLikes as usize] = likes.ln_1p();
        vector[Feature::LogDislikes as usize] = dislikes.ln_1p();
        vector[Feature::LikeRatio as usize] = (likes + 1.0) / (likes + dislikes + 2.0);
        vector[Feature::Seen as usize] = if collector.has_seen(id) { 1.0 } else { 0.0 };
        vector[Feature::AuthorAffinity as usize] = (affinity as f32).ln_1p();
        vector[Feature::AspectRatio as usize] = aspect_ratio;
        vector[Feature::PromptLength as usize] = (prompt_chars as f32).ln_1p();
        vector[Feature::Bias as usize] = 1.0;
        vector
    }

    /// Vector for the candidate at `index` in the filtered order.
    pub fn features(&self, index: usize) -> ArrayView1<'_, f32> {
        self.matrix.row(index)
    }

    /// The whole matrix, one row per candidate.
    pub fn all(&self) -> &FeatureMatrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> FeatureMatrix {
        self.matrix
    }
}
