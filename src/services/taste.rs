use crate::models::{Score, ValidationError, Vector};

/// Midpoint of the score range; a rating here leaves the taste unchanged
const NEUTRAL_SCORE: f32 = 2.5;

/// Maps a score in `[0, 5]` to a weight in `[-1, 1]`
pub fn score_weight(score: Score) -> f32 {
    (score.get() - NEUTRAL_SCORE) / NEUTRAL_SCORE
}

/// Folds one rating into a taste vector
///
/// Adds the movie embedding scaled by the score weight and renormalizes to
/// unit length. A zero accumulator is returned as is.
pub fn update_taste(taste: &Vector, embedding: &Vector, score: f32) -> Result<Vector, ValidationError> {
    taste.ensure_same_dimension(embedding)?;
    let weight = score_weight(Score::new(score)?);

    let accumulated: Vec<f32> = taste
        .as_slice()
        .iter()
        .zip(embedding.as_slice())
        .map(|(t, e)| t + weight * e)
        .collect();

    let magnitude = accumulated
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt();

    if magnitude == 0.0 {
        return Vector::try_from(accumulated);
    }

    Vector::try_from(
        accumulated
            .into_iter()
            .map(|v| (f64::from(v) / magnitude) as f32)
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[f32]) -> Vector {
        Vector::try_from(values.to_vec()).unwrap()
    }

    fn assert_close(actual: &Vector, expected: &[f32]) {
        assert_eq!(actual.dimension(), expected.len());
        for (a, e) in actual.as_slice().iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_score_weight_range() {
        assert_eq!(score_weight(Score::new(0.0).unwrap()), -1.0);
        assert_eq!(score_weight(Score::new(2.5).unwrap()), 0.0);
        assert_eq!(score_weight(Score::new(5.0).unwrap()), 1.0);
        assert_eq!(score_weight(Score::new(3.75).unwrap()), 0.5);
    }

    #[test]
    fn test_first_positive_rating_points_at_movie() {
        let taste = Vector::zeros(3);
        let updated = update_taste(&taste, &vector(&[1.0, 0.0, 0.0]), 5.0).unwrap();
        assert_close(&updated, &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_negative_rating_pushes_away() {
        let taste = vector(&[1.0, 0.0]);
        let updated = update_taste(&taste, &vector(&[0.0, 1.0]), 0.0).unwrap();
        let half = std::f32::consts::FRAC_1_SQRT_2;
        assert_close(&updated, &[half, -half]);
    }

    #[test]
    fn test_neutral_rating_on_zero_taste_stays_zero() {
        let taste = Vector::zeros(4);
        let updated = update_taste(&taste, &vector(&[0.3, 0.1, 0.2, 0.9]), 2.5).unwrap();
        assert!(updated.is_zero());
    }

    #[test]
    fn test_result_has_unit_norm() {
        let mut taste = Vector::zeros(3);
        let ratings = [
            (vec![0.2, 0.9, -0.4], 4.5),
            (vec![0.7, -0.1, 0.3], 1.0),
            (vec![-0.5, 0.5, 0.5], 3.5),
        ];
        for (embedding, score) in ratings {
            taste = update_taste(&taste, &vector(&embedding), score).unwrap();
            assert!((taste.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let result = update_taste(&Vector::zeros(3), &Vector::zeros(2), 4.0);
        assert_eq!(
            result,
            Err(ValidationError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let result = update_taste(&Vector::zeros(2), &Vector::zeros(2), 5.5);
        assert_eq!(result, Err(ValidationError::InvalidScore(5.5)));
    }
}
