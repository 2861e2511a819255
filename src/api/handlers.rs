use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::{AssertedEmail, CurrentUser, RequestToken},
    models::{Movie, MovieInput, Page, PageRequest, Rating, Role, User},
};

use super::AppState;

// Request/Response types

/// `page` / `pageSize` query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(params.page, params.page_size)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub term: String,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateMovieRequest {
    pub movie_id: Uuid,
    pub score: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub id: Uuid,
    pub title: String,
    pub genre: String,
    pub year: i32,
    pub wiki: String,
    pub plot: String,
    pub director: String,
    pub cast: String,
}

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            genre: movie.genre,
            year: movie.year,
            wiki: movie.wiki,
            plot: movie.plot,
            director: movie.director,
            cast: movie.cast,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub score: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Rating> for RatingResponse {
    fn from(rating: Rating) -> Self {
        Self {
            id: rating.id,
            user_id: rating.user_id,
            movie_id: rating.movie_id,
            score: rating.score.get(),
            created_at: rating.created_at,
            updated_at: rating.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovieEdge {
    pub node: MovieResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Paginated movies in connection shape
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieConnection {
    pub edges: Vec<MovieEdge>,
    pub page_info: PageInfo,
    pub total_count: i64,
}

impl From<Page<Movie>> for MovieConnection {
    fn from(page: Page<Movie>) -> Self {
        let page = page.map(|movie| MovieEdge { node: movie.into() });
        Self {
            edges: page.items,
            page_info: PageInfo {
                has_next_page: page.has_next_page,
                has_previous_page: page.has_previous_page,
            },
            total_count: page.total_count,
        }
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Provisions the asserted user on first sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    AssertedEmail(email): AssertedEmail,
    token: RequestToken,
    body: Option<Json<SignInRequest>>,
) -> AppResult<Json<UserResponse>> {
    let Json(request) = body.unwrap_or_default();
    let user = state.users.sign_in(&email, &request.name, &token).await?;
    Ok(Json(user.into()))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

pub async fn list_movies(
    State(state): State<AppState>,
    _user: CurrentUser,
    token: RequestToken,
    Query(params): Query<PageParams>,
) -> AppResult<Json<MovieConnection>> {
    let page = state.movies.list_movies(params.into(), &token).await?;
    Ok(Json(page.into()))
}

pub async fn search_movies(
    State(state): State<AppState>,
    _user: CurrentUser,
    token: RequestToken,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<MovieConnection>> {
    let request = PageRequest::new(params.page, params.page_size);
    let page = state
        .movies
        .search_movies(&params.term, request, &token)
        .await?;
    Ok(Json(page.into()))
}

/// Exact title lookup; `null` when no movie has the title
pub async fn get_movie_by_title(
    State(state): State<AppState>,
    _user: CurrentUser,
    token: RequestToken,
    Path(title): Path<String>,
) -> AppResult<Json<Option<MovieResponse>>> {
    let movie = state.movies.get_by_title(&title, &token).await?;
    Ok(Json(movie.map(MovieResponse::from)))
}

pub async fn get_movie(
    State(state): State<AppState>,
    _user: CurrentUser,
    token: RequestToken,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MovieResponse>> {
    let movie = state.movies.get_by_id(id, &token).await?;
    Ok(Json(movie.into()))
}

pub async fn create_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    token: RequestToken,
    Json(input): Json<MovieInput>,
) -> AppResult<(StatusCode, Json<MovieResponse>)> {
    let movie = state.movies.create_movie(&user, input, &token).await?;
    Ok((StatusCode::CREATED, Json(movie.into())))
}

pub async fn update_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    token: RequestToken,
    Path(id): Path<Uuid>,
    Json(input): Json<MovieInput>,
) -> AppResult<Json<MovieResponse>> {
    let movie = state.movies.update_movie(&user, id, input, &token).await?;
    Ok(Json(movie.into()))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    token: RequestToken,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MovieResponse>> {
    let movie = state.movies.delete_movie(&user, id, &token).await?;
    Ok(Json(movie.into()))
}

/// The current user's rating of a movie
pub async fn get_my_rating(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    token: RequestToken,
    Path(movie_id): Path<Uuid>,
) -> AppResult<Json<RatingResponse>> {
    let rating = state
        .ratings
        .get_rating_by_user_and_movie(user.id, movie_id, &token)
        .await?;
    Ok(Json(rating.into()))
}

pub async fn rate_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    token: RequestToken,
    Json(request): Json<RateMovieRequest>,
) -> AppResult<Json<RatingResponse>> {
    let rating = state
        .ratings
        .rate_movie(&user, request.movie_id, request.score, &token)
        .await?;
    Ok(Json(rating.into()))
}

pub async fn get_rating(
    State(state): State<AppState>,
    _user: CurrentUser,
    token: RequestToken,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RatingResponse>> {
    let rating = state.ratings.get_rating_by_id(id, &token).await?;
    Ok(Json(rating.into()))
}

pub async fn delete_rating(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    token: RequestToken,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let deleted = state.ratings.delete_rating(id, &user, &token).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

pub async fn recommendations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    token: RequestToken,
    Query(params): Query<PageParams>,
) -> AppResult<Json<MovieConnection>> {
    let page = state
        .recommendations
        .get_recommendations(&user, params.into(), &token)
        .await?;
    Ok(Json(page.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Vector;

    #[test]
    fn test_connection_shape_hides_embeddings() {
        let movie = Movie {
            id: Uuid::nil(),
            title: "Heat".to_string(),
            genre: "Crime".to_string(),
            year: 1995,
            wiki: String::new(),
            plot: String::new(),
            director: "Michael Mann".to_string(),
            cast: "Al Pacino".to_string(),
            embedding: Vector::zeros(3),
        };
        let page = Page::from_overfetch(vec![movie], 1, PageRequest::new(Some(2), Some(5)));

        let value = serde_json::to_value(MovieConnection::from(page)).unwrap();

        assert_eq!(value["totalCount"], 1);
        assert_eq!(value["pageInfo"]["hasNextPage"], false);
        assert_eq!(value["pageInfo"]["hasPreviousPage"], true);
        assert_eq!(value["edges"][0]["node"]["title"], "Heat");
        assert!(value["edges"][0]["node"].get("embedding").is_none());
    }
}
