use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{CommitOutcome, MovieStore, RatingLedger, RatingStore, TasteUpdate, UserStore},
    error::{AppError, AppResult},
    models::{Movie, MoviePage, Page, PageRequest, Rating, User, Vector},
};

/// Store that keeps everything in process memory
///
/// Cloning shares the same data. Mirrors the database constraints: unique
/// (user, movie) per rating, unique email per user.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    /// Keyed by id so iteration matches the `ORDER BY id` of the SQL backend
    movies: BTreeMap<Uuid, Movie>,
    ratings: HashMap<Uuid, Rating>,
    rating_index: HashMap<(Uuid, Uuid), Uuid>,
    users: HashMap<Uuid, User>,
}

impl StoreInner {
    fn insert_rating(&mut self, rating: Rating) -> AppResult<Rating> {
        let key = (rating.user_id, rating.movie_id);
        if self.rating_index.contains_key(&key) {
            return Err(AppError::Persistence(format!(
                "rating for user {} and movie {} already exists",
                rating.user_id, rating.movie_id
            )));
        }
        self.rating_index.insert(key, rating.id);
        self.ratings.insert(rating.id, rating.clone());
        Ok(rating)
    }

    /// Insert, or on (user, movie) conflict overwrite score and `updated_at`
    fn upsert_rating(&mut self, rating: Rating) -> Rating {
        let key = (rating.user_id, rating.movie_id);
        if let Some(existing) = self
            .rating_index
            .get(&key)
            .and_then(|id| self.ratings.get_mut(id))
        {
            existing.score = rating.score;
            existing.updated_at = rating.updated_at;
            return existing.clone();
        }
        self.rating_index.insert(key, rating.id);
        self.ratings.insert(rating.id, rating.clone());
        rating
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MovieStore for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner.movies.get(&id).cloned())
    }

    async fn get_by_title(&self, title: &str) -> AppResult<Option<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner.movies.values().find(|m| m.title == title).cloned())
    }

    async fn list_movies(&self, search: Option<String>, page: PageRequest) -> AppResult<MoviePage> {
        let inner = self.inner.read().await;
        let needle = search.map(|s| s.to_lowercase());

        let matching: Vec<Movie> = inner
            .movies
            .values()
            .filter(|m| needle.as_deref().map_or(true, |n| m.matches_term(n)))
            .cloned()
            .collect();
        let total_count = matching.len() as i64;

        Ok(Page::from_ordered(matching, total_count, page))
    }

    async fn get_similar_movies(&self, taste: &Vector, page: PageRequest) -> AppResult<MoviePage> {
        let inner = self.inner.read().await;

        let mut ranked = inner
            .movies
            .values()
            .map(|m| -> AppResult<(f64, &Movie)> { Ok((m.embedding.squared_distance(taste)?, m)) })
            .collect::<AppResult<Vec<_>>>()?;
        ranked.sort_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));

        let total_count = inner.movies.len() as i64;
        let ordered = ranked.into_iter().map(|(_, m)| m.clone()).collect();

        Ok(Page::from_ordered(ordered, total_count, page))
    }

    async fn create(&self, movie: &Movie) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.movies.contains_key(&movie.id) {
            return Err(AppError::Persistence(format!(
                "movie {} already exists",
                movie.id
            )));
        }
        inner.movies.insert(movie.id, movie.clone());
        Ok(())
    }

    async fn update(&self, movie: &Movie) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.movies.get_mut(&movie.id) {
            Some(existing) => {
                *existing = movie.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let mut inner = self.inner.write().await;
        let removed = inner.movies.remove(&id);
        if removed.is_some() {
            let orphaned: Vec<Uuid> = inner
                .ratings
                .values()
                .filter(|r| r.movie_id == id)
                .map(|r| r.id)
                .collect();
            for rating_id in orphaned {
                if let Some(rating) = inner.ratings.remove(&rating_id) {
                    inner.rating_index.remove(&(rating.user_id, rating.movie_id));
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl RatingStore for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Rating>> {
        let inner = self.inner.read().await;
        Ok(inner.ratings.get(&id).cloned())
    }

    async fn get_by_user_and_movie(
        &self,
        user_id: Uuid,
        movie_id: Uuid,
    ) -> AppResult<Option<Rating>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rating_index
            .get(&(user_id, movie_id))
            .and_then(|id| inner.ratings.get(id))
            .cloned())
    }

    async fn create(&self, rating: &Rating) -> AppResult<Rating> {
        let mut inner = self.inner.write().await;
        inner.insert_rating(rating.clone())
    }

    async fn update(&self, rating: &Rating) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.ratings.get_mut(&rating.id) {
            Some(existing) => {
                existing.score = rating.score;
                existing.updated_at = rating.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<Option<Rating>> {
        let mut inner = self.inner.write().await;
        let removed = inner.ratings.remove(&id);
        if let Some(rating) = &removed {
            inner.rating_index.remove(&(rating.user_id, rating.movie_id));
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: &User) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Persistence(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&user.id) {
            Some(existing) => {
                let version = existing.version + 1;
                *existing = User {
                    version,
                    ..user.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl RatingLedger for InMemoryStore {
    async fn commit_rating(&self, rating: Rating, taste: TasteUpdate) -> AppResult<CommitOutcome> {
        // A single write guard covers both changes, so readers never observe
        // the rating without the taste vector it produced.
        let mut inner = self.inner.write().await;

        match inner.users.get_mut(&taste.user_id) {
            Some(user) if user.version == taste.expected_version => {
                user.taste = taste.taste;
                user.version += 1;
            }
            _ => return Ok(CommitOutcome::VersionConflict),
        }

        Ok(CommitOutcome::Committed(inner.upsert_rating(rating)))
    }
}
