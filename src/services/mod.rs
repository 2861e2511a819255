//! Business logic between the HTTP layer and the stores
//!
//! Every service call takes a [`CancellationToken`]. Store calls race against
//! it through [`cancellable`], so a cancelled request or a server shutdown
//! stops at the next await point with [`AppError::Cancelled`].

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};

pub mod movies;
pub mod ratings;
pub mod recommendations;
pub mod taste;
pub mod users;

pub use movies::MovieService;
pub use ratings::RatingService;
pub use recommendations::RecommendationService;
pub use taste::{score_weight, update_taste};
pub use users::UserService;

/// Runs `fut` unless `token` is cancelled first
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    if token.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AppError::Cancelled),
        result = fut => result,
    }
}
