use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::cancellable;
use crate::{
    db::{MovieStore, Stores},
    error::{AppError, AppResult},
    models::{Movie, MovieInput, MoviePage, PageRequest, User},
};

/// Catalog browsing and admin-only catalog management
#[derive(Clone)]
pub struct MovieService {
    movies: Arc<dyn MovieStore>,
    dimension: usize,
}

fn require_admin(user: &User) -> AppResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Unauthorized("admin role required".to_string()))
    }
}

impl MovieService {
    pub fn new(stores: &Stores, dimension: usize) -> Self {
        Self {
            movies: stores.movies.clone(),
            dimension,
        }
    }

    pub async fn list_movies(
        &self,
        page: PageRequest,
        token: &CancellationToken,
    ) -> AppResult<MoviePage> {
        cancellable(token, self.movies.list_movies(None, page)).await
    }

    /// Case-insensitive search over title, cast and director
    ///
    /// A blank term lists the whole catalog.
    pub async fn search_movies(
        &self,
        term: &str,
        page: PageRequest,
        token: &CancellationToken,
    ) -> AppResult<MoviePage> {
        let term = term.trim();
        let search = (!term.is_empty()).then(|| term.to_string());
        cancellable(token, self.movies.list_movies(search, page)).await
    }

    pub async fn get_by_id(&self, id: Uuid, token: &CancellationToken) -> AppResult<Movie> {
        cancellable(token, self.movies.get_by_id(id))
            .await?
            .ok_or(AppError::MovieNotFound(id))
    }

    /// Exact title lookup; `None` when no movie carries that title
    pub async fn get_by_title(
        &self,
        title: &str,
        token: &CancellationToken,
    ) -> AppResult<Option<Movie>> {
        cancellable(token, self.movies.get_by_title(title)).await
    }

    #[tracing::instrument(skip(self, admin, input, token), fields(user_id = %admin.id))]
    pub async fn create_movie(
        &self,
        admin: &User,
        input: MovieInput,
        token: &CancellationToken,
    ) -> AppResult<Movie> {
        require_admin(admin)?;
        let movie = input.into_movie(Uuid::new_v4(), self.dimension)?;

        cancellable(token, self.movies.create(&movie)).await?;

        tracing::info!(movie_id = %movie.id, title = %movie.title, "Movie created");
        Ok(movie)
    }

    #[tracing::instrument(skip(self, admin, input, token), fields(user_id = %admin.id))]
    pub async fn update_movie(
        &self,
        admin: &User,
        id: Uuid,
        input: MovieInput,
        token: &CancellationToken,
    ) -> AppResult<Movie> {
        require_admin(admin)?;
        let movie = input.into_movie(id, self.dimension)?;

        if !cancellable(token, self.movies.update(&movie)).await? {
            return Err(AppError::MovieNotFound(id));
        }

        tracing::info!(movie_id = %id, "Movie updated");
        Ok(movie)
    }

    #[tracing::instrument(skip(self, admin, token), fields(user_id = %admin.id))]
    pub async fn delete_movie(
        &self,
        admin: &User,
        id: Uuid,
        token: &CancellationToken,
    ) -> AppResult<Movie> {
        require_admin(admin)?;

        let deleted = cancellable(token, self.movies.delete(id))
            .await?
            .ok_or(AppError::MovieNotFound(id))?;

        tracing::info!(movie_id = %id, "Movie deleted");
        Ok(deleted)
    }
}
