use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use super::{ValidationError, Vector};

/// Access role attached to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(ValidationError::InvalidIdentifier(format!(
                "unknown role '{}'",
                other
            ))),
        }
    }
}

/// A registered user and their taste vector
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Unit-norm preference vector, or the zero vector before any rating
    pub taste: Vector,
    /// Bumped on every taste write
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a `USER`-role account with a zero taste vector
    pub fn new(email: &str, name: &str, dimension: usize) -> Result<Self, ValidationError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ValidationError::EmptyField("email"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            email,
            name: name.trim().to_string(),
            role: Role::User,
            taste: Vector::zeros(dimension),
            version: 0,
            created_at: Utc::now(),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
