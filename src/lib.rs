//! Movie rating backend with taste-vector recommendations
//!
//! Every rating nudges the user's unit-length taste vector toward (or away
//! from) the rated movie's embedding; recommendations rank the catalog by
//! distance to that vector.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
