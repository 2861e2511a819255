use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::cancellable;
use crate::{
    db::{MovieStore, Stores, UserStore},
    error::{AppError, AppResult},
    models::{MoviePage, PageRequest, User},
};

/// Ranks the catalog by closeness to a user's taste vector
#[derive(Clone)]
pub struct RecommendationService {
    movies: Arc<dyn MovieStore>,
    users: Arc<dyn UserStore>,
}

impl RecommendationService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            movies: stores.movies.clone(),
            users: stores.users.clone(),
        }
    }

    /// Movies ordered by ascending distance to the user's current taste
    ///
    /// The taste is re-read so a rating committed earlier in the same session
    /// is reflected. With a zero taste the order is by embedding magnitude.
    #[tracing::instrument(skip(self, user, token), fields(user_id = %user.id))]
    pub async fn get_recommendations(
        &self,
        user: &User,
        page: PageRequest,
        token: &CancellationToken,
    ) -> AppResult<MoviePage> {
        let current = cancellable(token, self.users.get_by_id(user.id))
            .await?
            .ok_or_else(|| AppError::UserNotFound(user.id.to_string()))?;

        let recommendations =
            cancellable(token, self.movies.get_similar_movies(&current.taste, page)).await?;

        tracing::debug!(
            returned = recommendations.items.len(),
            total = recommendations.total_count,
            "Recommendations ranked"
        );
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, MockMovieStore, MockRatingLedger, MockRatingStore, MockUserStore};
    use crate::models::{Movie, Vector};
    use uuid::Uuid;

    fn movie(title: &str, embedding: Vec<f32>) -> Movie {
        Movie {
            id: Uuid::new_v4(),
            title: title.to_string(),
            genre: String::new(),
            year: 2001,
            wiki: String::new(),
            plot: String::new(),
            director: String::new(),
            cast: String::new(),
            embedding: Vector::try_from(embedding).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_uses_stored_taste_not_caller_copy() {
        let stale = User::new("a@example.com", "A", 2).unwrap();
        let fresh = User {
            taste: Vector::new(vec![0.0, 1.0], 2).unwrap(),
            version: 1,
            ..stale.clone()
        };

        let mut users = MockUserStore::new();
        users
            .expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(Some(fresh.clone())));

        let mut movies = MockMovieStore::new();
        movies
            .expect_get_similar_movies()
            .withf(|taste, _| taste.as_slice() == [0.0, 1.0])
            .times(1)
            .returning(|_, page| Ok(MoviePage::from_overfetch(vec![], 0, page)));

        let service = RecommendationService::new(&Stores {
            movies: Arc::new(movies),
            ratings: Arc::new(MockRatingStore::new()),
            users: Arc::new(users),
            ledger: Arc::new(MockRatingLedger::new()),
        });

        let page = service
            .get_recommendations(&stale, PageRequest::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let service = RecommendationService::new(&Stores::in_memory(InMemoryStore::new()));
        let ghost = User::new("ghost@example.com", "Ghost", 2).unwrap();

        let result = service
            .get_recommendations(&ghost, PageRequest::default(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_pages_through_ranked_catalog() {
        let store = InMemoryStore::new();
        let user = User {
            taste: Vector::new(vec![1.0, 0.0], 2).unwrap(),
            ..User::new("a@example.com", "A", 2).unwrap()
        };
        UserStore::create(&store, &user).await.unwrap();
        for (title, embedding) in [
            ("First", vec![1.0, 0.0]),
            ("Second", vec![0.8, 0.6]),
            ("Third", vec![0.0, 1.0]),
        ] {
            MovieStore::create(&store, &movie(title, embedding))
                .await
                .unwrap();
        }

        let service = RecommendationService::new(&Stores::in_memory(store));
        let token = CancellationToken::new();

        let first = service
            .get_recommendations(&user, PageRequest::new(Some(1), Some(2)), &token)
            .await
            .unwrap();
        assert_eq!(
            first.items.iter().map(|m| m.title.as_str()).collect::<Vec<_>>(),
            vec!["First", "Second"]
        );
        assert!(first.has_next_page);
        assert!(!first.has_previous_page);
        assert_eq!(first.total_count, 3);

        let second = service
            .get_recommendations(&user, PageRequest::new(Some(2), Some(2)), &token)
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].title, "Third");
        assert!(!second.has_next_page);
        assert!(second.has_previous_page);
    }
}
