use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{cancellable, taste::update_taste};
use crate::{
    db::{CommitOutcome, MovieStore, RatingLedger, RatingStore, Stores, TasteUpdate, UserStore},
    error::{AppError, AppResult},
    models::{Rating, Score, User},
};

/// Attempts at committing a rating before a version conflict is reported
pub const MAX_COMMIT_ATTEMPTS: usize = 5;

/// One async mutex per user id
///
/// Entries are dropped once no task holds or waits on them.
#[derive(Clone, Default)]
struct UserLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(user_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Rating writes and the taste vector updates they drive
#[derive(Clone)]
pub struct RatingService {
    movies: Arc<dyn MovieStore>,
    ratings: Arc<dyn RatingStore>,
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn RatingLedger>,
    locks: UserLocks,
}

impl RatingService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            movies: stores.movies.clone(),
            ratings: stores.ratings.clone(),
            users: stores.users.clone(),
            ledger: stores.ledger.clone(),
            locks: UserLocks::default(),
        }
    }

    /// Creates or replaces `user`'s rating of a movie and folds it into their taste
    ///
    /// Only the identity of `user` is used; taste and version are re-read from
    /// the store on every attempt. The rating and the new taste are committed
    /// together, or not at all.
    #[tracing::instrument(skip(self, user, token), fields(user_id = %user.id))]
    pub async fn rate_movie(
        &self,
        user: &User,
        movie_id: Uuid,
        score: f32,
        token: &CancellationToken,
    ) -> AppResult<Rating> {
        let score = Score::new(score)?;

        let movie = cancellable(token, self.movies.get_by_id(movie_id))
            .await?
            .ok_or(AppError::MovieNotFound(movie_id))?;

        let _guard = self.locks.acquire(user.id).await;

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let current = cancellable(token, self.users.get_by_id(user.id))
                .await?
                .ok_or_else(|| AppError::UserNotFound(user.id.to_string()))?;

            let rating = match cancellable(
                token,
                self.ratings.get_by_user_and_movie(user.id, movie_id),
            )
            .await?
            {
                Some(mut existing) => {
                    existing.rescore(score);
                    existing
                }
                None => Rating::new(user.id, movie_id, score),
            };

            let taste = update_taste(&current.taste, &movie.embedding, score.get())?;
            let update = TasteUpdate {
                user_id: user.id,
                taste,
                expected_version: current.version,
            };

            match cancellable(token, self.ledger.commit_rating(rating, update)).await? {
                CommitOutcome::Committed(stored) => {
                    tracing::info!(
                        rating_id = %stored.id,
                        score = stored.score.get(),
                        attempt,
                        "Rating committed"
                    );
                    return Ok(stored);
                }
                CommitOutcome::VersionConflict => {
                    tracing::warn!(attempt, "Taste version changed during rating, retrying");
                }
            }
        }

        Err(AppError::Persistence(format!(
            "rating for movie {} not committed after {} attempts",
            movie_id, MAX_COMMIT_ATTEMPTS
        )))
    }

    /// Deletes a rating owned by `requester`, or any rating for an admin
    ///
    /// The taste contribution of the deleted rating is kept.
    #[tracing::instrument(skip(self, requester, token), fields(user_id = %requester.id))]
    pub async fn delete_rating(
        &self,
        rating_id: Uuid,
        requester: &User,
        token: &CancellationToken,
    ) -> AppResult<bool> {
        let rating = cancellable(token, self.ratings.get_by_id(rating_id))
            .await?
            .ok_or(AppError::RatingNotFound(rating_id))?;

        if rating.user_id != requester.id && !requester.is_admin() {
            return Err(AppError::Unauthorized(
                "only the owner or an admin can delete a rating".to_string(),
            ));
        }

        let deleted = cancellable(token, self.ratings.delete(rating_id)).await?;
        if deleted.is_none() {
            return Err(AppError::RatingNotFound(rating_id));
        }

        tracing::info!(rating_id = %rating_id, "Rating deleted");
        Ok(true)
    }

    pub async fn get_rating_by_id(
        &self,
        rating_id: Uuid,
        token: &CancellationToken,
    ) -> AppResult<Rating> {
        cancellable(token, self.ratings.get_by_id(rating_id))
            .await?
            .ok_or(AppError::RatingNotFound(rating_id))
    }

    /// The rating `user_id` gave `movie_id`
    ///
    /// Not found carries the nil id since no rating id exists for the pair.
    pub async fn get_rating_by_user_and_movie(
        &self,
        user_id: Uuid,
        movie_id: Uuid,
        token: &CancellationToken,
    ) -> AppResult<Rating> {
        cancellable(token, self.ratings.get_by_user_and_movie(user_id, movie_id))
            .await?
            .ok_or(AppError::RatingNotFound(Uuid::nil()))
    }
}
