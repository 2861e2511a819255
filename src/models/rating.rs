use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

/// Lowest accepted score
pub const MIN_SCORE: f32 = 0.0;
/// Highest accepted score
pub const MAX_SCORE: f32 = 5.0;

/// A rating score, guaranteed finite and within `[0, 5]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Score(f32);

impl Score {
    pub fn new(value: f32) -> Result<Self, ValidationError> {
        if value.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidScore(value))
        }
    }

    pub const fn get(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Score {
    type Error = ValidationError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for f32 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// A user's score for one movie
///
/// At most one rating exists per `(user_id, movie_id)`; re-rating updates the
/// existing row in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub score: Score,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rating {
    /// Creates a rating with a fresh id and matching creation/update timestamps
    pub fn new(user_id: Uuid, movie_id: Uuid, score: Score) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            movie_id,
            score,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the score and refreshes `updated_at`
    pub fn rescore(&mut self, score: Score) {
        self.score = score;
        self.updated_at = Utc::now();
    }
}
