use thiserror::Error;

pub mod movie;
pub mod page;
pub mod rating;
pub mod user;
pub mod vector;

pub use movie::{Movie, MovieInput};
pub use page::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use rating::{Rating, Score, MAX_SCORE, MIN_SCORE};
pub use user::{Role, User};
pub use vector::{Vector, DEFAULT_DIMENSION};

/// A page of movies as returned by listing, search and recommendations
pub type MoviePage = Page<Movie>;

/// Errors raised when input fails domain validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("score {0} is outside the accepted range [0, 5]")]
    InvalidScore(f32),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector component {0} is not a finite number")]
    NonFiniteComponent(usize),

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::DimensionMismatch {
                expected: 512,
                actual: 3
            }
            .to_string(),
            "vector dimension mismatch: expected 512, got 3"
        );
        assert_eq!(
            ValidationError::InvalidScore(6.0).to_string(),
            "score 6 is outside the accepted range [0, 5]"
        );
    }
}
