use tokio_util::sync::CancellationToken;

use crate::{
    db::{InMemoryStore, Stores},
    services::{MovieService, RatingService, RecommendationService, UserService},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub movies: MovieService,
    pub ratings: RatingService,
    pub recommendations: RecommendationService,
    pub users: UserService,
    /// Root token; cancelled when the server shuts down
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wires every service onto the same set of stores
    pub fn new(stores: Stores, dimension: usize, shutdown: CancellationToken) -> Self {
        Self {
            movies: MovieService::new(&stores, dimension),
            ratings: RatingService::new(&stores),
            recommendations: RecommendationService::new(&stores),
            users: UserService::new(&stores, dimension),
            shutdown,
        }
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(dimension: usize) -> Self {
        Self::new(
            Stores::in_memory(InMemoryStore::new()),
            dimension,
            CancellationToken::new(),
        )
    }
}
