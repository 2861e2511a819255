//! Persistence boundary
//!
//! Services only see the store traits below. Two backends implement them:
//! PostgreSQL via sqlx for deployments, and an in-memory store for tests and
//! local runs without a database.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Movie, MoviePage, PageRequest, Rating, User, Vector},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};

/// Movie catalog storage
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Movie>>;

    /// Exact title lookup
    async fn get_by_title(&self, title: &str) -> AppResult<Option<Movie>>;

    /// Lists movies ordered by id, optionally filtered by a case-insensitive
    /// substring match on title, cast or director
    ///
    /// `total_count` counts the rows matching the same filter.
    async fn list_movies(&self, search: Option<String>, page: PageRequest) -> AppResult<MoviePage>;

    /// Lists movies by ascending distance between their embedding and `taste`
    ///
    /// `total_count` is the size of the whole catalog.
    async fn get_similar_movies(&self, taste: &Vector, page: PageRequest) -> AppResult<MoviePage>;

    async fn create(&self, movie: &Movie) -> AppResult<()>;

    /// Returns `false` when no movie has the given id
    async fn update(&self, movie: &Movie) -> AppResult<bool>;

    /// Returns the deleted movie, if it existed
    async fn delete(&self, id: Uuid) -> AppResult<Option<Movie>>;
}

/// Rating storage, at most one rating per (user, movie)
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Rating>>;

    async fn get_by_user_and_movie(&self, user_id: Uuid, movie_id: Uuid)
        -> AppResult<Option<Rating>>;

    async fn create(&self, rating: &Rating) -> AppResult<Rating>;

    /// Persists the score and `updated_at` of an existing rating
    async fn update(&self, rating: &Rating) -> AppResult<bool>;

    /// Returns the deleted rating, if it existed
    async fn delete(&self, id: Uuid) -> AppResult<Option<Rating>>;
}

/// User storage
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn create(&self, user: &User) -> AppResult<()>;

    /// Unconditionally overwrites the user row and bumps its version
    async fn update(&self, user: &User) -> AppResult<bool>;
}

/// New taste vector for a user, conditional on the version it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct TasteUpdate {
    pub user_id: Uuid,
    pub taste: Vector,
    pub expected_version: i64,
}

/// Result of [`RatingLedger::commit_rating`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Both writes were applied; carries the stored rating
    Committed(Rating),
    /// The user's version moved since it was read; nothing was written
    VersionConflict,
}

/// Transactional write of a rating together with the taste vector it produced
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingLedger: Send + Sync {
    /// Upserts `rating` keyed on (user, movie) and stores `taste` in a single
    /// transaction, only if the user row still has `taste.expected_version`
    async fn commit_rating(&self, rating: Rating, taste: TasteUpdate) -> AppResult<CommitOutcome>;
}

/// The full set of stores handed to the services
#[derive(Clone)]
pub struct Stores {
    pub movies: Arc<dyn MovieStore>,
    pub ratings: Arc<dyn RatingStore>,
    pub users: Arc<dyn UserStore>,
    pub ledger: Arc<dyn RatingLedger>,
}

impl Stores {
    /// Stores backed by a PostgreSQL pool
    pub fn postgres(pool: PgPool) -> Self {
        let store = PgStore::new(pool);
        Self {
            movies: Arc::new(store.clone()),
            ratings: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            ledger: Arc::new(store),
        }
    }

    /// Stores sharing one in-memory dataset
    pub fn in_memory(store: InMemoryStore) -> Self {
        Self {
            movies: Arc::new(store.clone()),
            ratings: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            ledger: Arc::new(store),
        }
    }
}
