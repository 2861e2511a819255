use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{
    make_span_with_request_id, request_id_middleware, REQUEST_ID_HEADER, USER_EMAIL_HEADER,
};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    create_router_with_cors(state, None)
}

/// Creates the router, allowing cross-origin requests from `cors_origin`
pub fn create_router_with_cors(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health_check))
        // Identity
        .route("/auth/signin", post(handlers::sign_in))
        .route("/me", get(handlers::me))
        // Catalog
        .route(
            "/movies",
            get(handlers::list_movies).post(handlers::create_movie),
        )
        .route("/movies/search", get(handlers::search_movies))
        .route("/movies/title/:title", get(handlers::get_movie_by_title))
        .route(
            "/movies/:id",
            get(handlers::get_movie)
                .put(handlers::update_movie)
                .delete(handlers::delete_movie),
        )
        .route("/movies/:id/rating", get(handlers::get_my_rating))
        // Ratings
        .route("/ratings", post(handlers::rate_movie))
        .route(
            "/ratings/:id",
            get(handlers::get_rating).delete(handlers::delete_rating),
        )
        // Recommendations
        .route("/recommendations", get(handlers::recommendations))
        .with_state(state);

    // Outermost first: the request id must exist before the span is made.
    let router = router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
    );

    match cors_origin {
        Some(origin) => router.layer(cors_layer(origin)),
        None => router,
    }
}

fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_EMAIL_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
}
