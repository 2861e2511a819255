//! End-to-end rating flow over the in-memory backend

use std::f32::consts::FRAC_1_SQRT_2;

use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use nextwatch_api::{
    db::{InMemoryStore, MovieStore, RatingStore, Stores, UserStore},
    error::AppError,
    models::{Movie, PageRequest, User, Vector},
    services::{update_taste, MovieService, RatingService, RecommendationService},
};

struct Fixture {
    store: InMemoryStore,
    ratings: RatingService,
    movies: MovieService,
    recommendations: RecommendationService,
    token: CancellationToken,
}

impl Fixture {
    fn new(dimension: usize) -> Self {
        let store = InMemoryStore::new();
        let stores = Stores::in_memory(store.clone());
        Self {
            ratings: RatingService::new(&stores),
            movies: MovieService::new(&stores, dimension),
            recommendations: RecommendationService::new(&stores),
            store,
            token: CancellationToken::new(),
        }
    }

    async fn user(&self, email: &str, dimension: usize) -> User {
        let user = User::new(email, "Viewer", dimension).unwrap();
        UserStore::create(&self.store, &user).await.unwrap();
        user
    }

    async fn movie(&self, title: &str, embedding: Vec<f32>) -> Movie {
        let movie = Movie {
            id: Uuid::new_v4(),
            title: title.to_string(),
            genre: "Drama".to_string(),
            year: 2010,
            wiki: String::new(),
            plot: String::new(),
            director: String::new(),
            cast: String::new(),
            embedding: Vector::try_from(embedding).unwrap(),
        };
        MovieStore::create(&self.store, &movie).await.unwrap();
        movie
    }

    async fn taste(&self, user: &User) -> Vector {
        UserStore::get_by_id(&self.store, user.id)
            .await
            .unwrap()
            .unwrap()
            .taste
    }
}

fn assert_close(actual: &Vector, expected: &[f32]) {
    for (a, e) in actual.as_slice().iter().zip(expected) {
        assert!((a - e).abs() < 1e-4, "{:?} != {:?}", actual, expected);
    }
}

#[tokio::test]
async fn test_positive_then_negative_rating_moves_taste() {
    let fx = Fixture::new(4);
    let user = fx.user("viewer@example.com", 4).await;
    let a = fx.movie("A", vec![1.0, 0.0, 0.0, 0.0]).await;
    let b = fx.movie("B", vec![0.0, 1.0, 0.0, 0.0]).await;

    assert_ok!(fx.ratings.rate_movie(&user, a.id, 5.0, &fx.token).await);
    assert_close(&fx.taste(&user).await, &[1.0, 0.0, 0.0, 0.0]);

    assert_ok!(fx.ratings.rate_movie(&user, b.id, 0.0, &fx.token).await);
    assert_close(
        &fx.taste(&user).await,
        &[FRAC_1_SQRT_2, -FRAC_1_SQRT_2, 0.0, 0.0],
    );
}

#[tokio::test]
async fn test_third_page_of_twenty_five() {
    let fx = Fixture::new(2);
    for i in 0..25 {
        fx.movie(&format!("Movie {:02}", i), vec![i as f32, 0.0]).await;
    }

    let page = fx
        .movies
        .list_movies(PageRequest::new(Some(3), Some(10)), &fx.token)
        .await
        .unwrap();

    assert_eq!(page.items.len(), 5);
    assert!(!page.has_next_page);
    assert!(page.has_previous_page);
    assert_eq!(page.total_count, 25);

    let user = fx.user("viewer@example.com", 2).await;
    let ranked = fx
        .recommendations
        .get_recommendations(&user, PageRequest::new(Some(3), Some(10)), &fx.token)
        .await
        .unwrap();
    assert_eq!(ranked.items.len(), 5);
    assert_eq!(ranked.total_count, 25);
    assert_eq!(ranked.items[0].title, "Movie 20");
}

#[tokio::test]
async fn test_stranger_cannot_delete_rating() {
    let fx = Fixture::new(2);
    let owner = fx.user("owner@example.com", 2).await;
    let stranger = fx.user("stranger@example.com", 2).await;
    let movie = fx.movie("A", vec![1.0, 0.0]).await;

    let rating = fx
        .ratings
        .rate_movie(&owner, movie.id, 4.0, &fx.token)
        .await
        .unwrap();

    let result = fx.ratings.delete_rating(rating.id, &stranger, &fx.token).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert_ok!(fx.ratings.get_rating_by_id(rating.id, &fx.token).await);
}

#[tokio::test]
async fn test_rating_unknown_movie_leaves_no_rating() {
    let fx = Fixture::new(2);
    let user = fx.user("viewer@example.com", 2).await;
    let missing = Uuid::new_v4();

    let result = fx.ratings.rate_movie(&user, missing, 3.0, &fx.token).await;
    assert!(matches!(result, Err(AppError::MovieNotFound(id)) if id == missing));

    assert_err!(
        fx.ratings
            .get_rating_by_user_and_movie(user.id, missing, &fx.token)
            .await
    );
    assert!(fx.taste(&user).await.is_zero());
}

#[tokio::test]
async fn test_deleting_rating_keeps_taste() {
    let fx = Fixture::new(2);
    let user = fx.user("viewer@example.com", 2).await;
    let movie = fx.movie("A", vec![0.0, 1.0]).await;

    let rating = fx
        .ratings
        .rate_movie(&user, movie.id, 5.0, &fx.token)
        .await
        .unwrap();
    assert!(fx
        .ratings
        .delete_rating(rating.id, &user, &fx.token)
        .await
        .unwrap());

    assert_close(&fx.taste(&user).await, &[0.0, 1.0]);
    assert!(RatingStore::get_by_id(&fx.store, rating.id)
        .await
        .unwrap()
        .is_none());
}

/// Two unsynchronized read-modify-write cycles lose one of the updates
#[tokio::test]
async fn test_naive_read_modify_write_loses_update() {
    let fx = Fixture::new(2);
    let user = fx.user("viewer@example.com", 2).await;
    let a = fx.movie("A", vec![1.0, 0.0]).await;
    let b = fx.movie("B", vec![0.0, 1.0]).await;

    let first_read = UserStore::get_by_id(&fx.store, user.id).await.unwrap().unwrap();
    let second_read = UserStore::get_by_id(&fx.store, user.id).await.unwrap().unwrap();

    let first = User {
        taste: update_taste(&first_read.taste, &a.embedding, 5.0).unwrap(),
        ..first_read
    };
    let second = User {
        taste: update_taste(&second_read.taste, &b.embedding, 5.0).unwrap(),
        ..second_read
    };
    UserStore::update(&fx.store, &first).await.unwrap();
    UserStore::update(&fx.store, &second).await.unwrap();

    // The contribution of movie A is gone.
    assert_close(&fx.taste(&user).await, &[0.0, 1.0]);
}

#[tokio::test]
async fn test_service_keeps_every_concurrent_rating() {
    const DIM: usize = 32;
    let fx = Fixture::new(DIM);
    let user = fx.user("viewer@example.com", DIM).await;

    let mut movies = Vec::with_capacity(DIM);
    for i in 0..DIM {
        let mut embedding = vec![0.0; DIM];
        embedding[i] = 1.0;
        movies.push(fx.movie(&format!("Basis {}", i), embedding).await);
    }

    let tasks: Vec<_> = movies
        .iter()
        .map(|movie| {
            let ratings = fx.ratings.clone();
            let user = user.clone();
            let token = fx.token.clone();
            let movie_id = movie.id;
            tokio::spawn(async move { ratings.rate_movie(&user, movie_id, 5.0, &token).await })
        })
        .collect();
    for task in tasks {
        assert_ok!(task.await.unwrap());
    }

    let taste = fx.taste(&user).await;
    assert!(taste.as_slice().iter().all(|v| *v > 0.0));
    assert!((taste.norm() - 1.0).abs() < 1e-5);
}
