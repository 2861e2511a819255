//! Caller identity and per-request cancellation
//!
//! Authentication happens upstream; the identity provider forwards the
//! verified email address in [`USER_EMAIL_HEADER`].

use std::ops::Deref;

use axum::{extract::FromRequestParts, http::request::Parts};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    api::AppState,
    error::AppError,
    models::User,
};

/// Header carrying the email asserted by the identity provider
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The email asserted for this request, not yet resolved to an account
#[derive(Debug, Clone)]
pub struct AssertedEmail(pub String);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AssertedEmail {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(|email| AssertedEmail(email.to_string()))
            .ok_or(AppError::Unauthenticated)
    }
}

/// Cancellation token scoped to one request
///
/// A child of the server shutdown token. It is also cancelled when the
/// handler future is dropped, e.g. on client disconnect.
pub struct RequestToken {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestToken {
    pub fn new(parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let _guard = token.clone().drop_guard();
        Self { token, _guard }
    }
}

impl Deref for RequestToken {
    type Target = CancellationToken;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequestToken {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(RequestToken::new(&state.shutdown))
    }
}

/// The signed-in user making the request
///
/// Rejects with 401 when the header is missing or names no known account.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AssertedEmail(email) = AssertedEmail::from_request_parts(parts, state).await?;
        let token = RequestToken::new(&state.shutdown);

        match state.users.get_by_email(&email, &token).await {
            Ok(user) => {
                tracing::Span::current().record("user_id", tracing::field::display(user.id));
                Ok(CurrentUser(user))
            }
            Err(AppError::UserNotFound(_)) => {
                tracing::debug!(email = %email, "Unknown user asserted");
                Err(AppError::Unauthenticated)
            }
            Err(err) => Err(err),
        }
    }
}

impl Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_token_cancelled_on_drop() {
        let root = CancellationToken::new();
        let request = RequestToken::new(&root);
        let observed: CancellationToken = (*request).clone();

        drop(request);

        assert!(observed.is_cancelled());
        assert!(!root.is_cancelled());
    }

    #[test]
    fn test_request_token_follows_shutdown() {
        let root = CancellationToken::new();
        let request = RequestToken::new(&root);

        root.cancel();

        assert!(request.is_cancelled());
    }
}
