use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Default embedding dimension used for movies and user taste vectors
pub const DEFAULT_DIMENSION: usize = 512;

/// Fixed-dimension numeric vector
///
/// Used both for movie embeddings and user taste vectors. The dimension is
/// checked when the vector is built, so arithmetic on two vectors only has to
/// compare lengths, never re-validate components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Vector(Vec<f32>);

impl Vector {
    /// Builds a vector, requiring exactly `dimension` finite components
    pub fn new(values: Vec<f32>, dimension: usize) -> Result<Self, ValidationError> {
        if values.len() != dimension {
            return Err(ValidationError::DimensionMismatch {
                expected: dimension,
                actual: values.len(),
            });
        }
        Self::try_from(values)
    }

    /// The zero vector of the given dimension
    pub fn zeros(dimension: usize) -> Self {
        Self(vec![0.0; dimension])
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean norm
    pub fn norm(&self) -> f32 {
        self.0
            .iter()
            .map(|v| f64::from(*v) * f64::from(*v))
            .sum::<f64>()
            .sqrt() as f32
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    /// Fails with `DimensionMismatch` unless both vectors have the same length
    pub fn ensure_same_dimension(&self, other: &Vector) -> Result<(), ValidationError> {
        if self.dimension() != other.dimension() {
            return Err(ValidationError::DimensionMismatch {
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }
        Ok(())
    }

    /// Squared Euclidean distance to `other`
    ///
    /// Ranking by the squared distance gives the same order as ranking by the
    /// distance itself.
    pub fn squared_distance(&self, other: &Vector) -> Result<f64, ValidationError> {
        self.ensure_same_dimension(other)?;
        Ok(self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| {
                let d = f64::from(*a) - f64::from(*b);
                d * d
            })
            .sum())
    }
}

impl TryFrom<Vec<f32>> for Vector {
    type Error = ValidationError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFiniteComponent(index));
        }
        Ok(Self(values))
    }
}

impl From<Vector> for Vec<f32> {
    fn from(vector: Vector) -> Self {
        vector.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_dimension() {
        let result = Vector::new(vec![1.0, 2.0, 3.0], 4);
        assert_eq!(
            result,
            Err(ValidationError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_new_rejects_nan() {
        let result = Vector::new(vec![1.0, f32::NAN], 2);
        assert_eq!(result, Err(ValidationError::NonFiniteComponent(1)));
    }

    #[test]
    fn test_zeros() {
        let v = Vector::zeros(512);
        assert_eq!(v.dimension(), 512);
        assert!(v.is_zero());
        assert_eq!(v.norm(), 0.0);
    }

    #[test]
    fn test_squared_distance() {
        let a = Vector::new(vec![1.0, 0.0, 0.0], 3).unwrap();
        let b = Vector::new(vec![0.0, 1.0, 0.0], 3).unwrap();
        assert!((a.squared_distance(&b).unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(a.squared_distance(&a).unwrap(), 0.0);
    }

    #[test]
    fn test_squared_distance_dimension_mismatch() {
        let a = Vector::zeros(3);
        let b = Vector::zeros(4);
        assert!(matches!(
            a.squared_distance(&b),
            Err(ValidationError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_deserialize_validates_components() {
        let ok: Vector = serde_json::from_str("[0.5, -0.5]").unwrap();
        assert_eq!(ok.as_slice(), &[0.5, -0.5]);
    }
}
