use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ValidationError, Vector};

/// A catalogued movie with its content embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub genre: String,
    pub year: i32,
    pub wiki: String,
    pub plot: String,
    pub director: String,
    pub cast: String,
    /// Set once at ingestion, never touched by the rating flow
    pub embedding: Vector,
}

/// Catalog input used to create or replace a movie
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieInput {
    pub title: String,
    pub genre: String,
    pub year: i32,
    #[serde(default)]
    pub wiki: String,
    #[serde(default)]
    pub plot: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub cast: String,
    pub embedding: Vec<f32>,
}

impl MovieInput {
    /// Validates the input and turns it into a movie with the given id
    pub fn into_movie(self, id: Uuid, dimension: usize) -> Result<Movie, ValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }

        Ok(Movie {
            id,
            title,
            genre: self.genre,
            year: self.year,
            wiki: self.wiki,
            plot: self.plot,
            director: self.director,
            cast: self.cast,
            embedding: Vector::new(self.embedding, dimension)?,
        })
    }
}

impl Movie {
    /// Case-insensitive substring match over title, cast and director
    ///
    /// `needle` must already be lowercased.
    pub fn matches_term(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.cast.to_lowercase().contains(needle)
            || self.director.to_lowercase().contains(needle)
    }
}
