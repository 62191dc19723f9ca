// Library exports for Tuiter
// This allows integration tests and external code to use Tuiter modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod likes;
pub mod media;
pub mod routes;
pub mod state;
