//! REST API over users and their posts.
//!
//! - CRUD for both collections with sequential numeric ids
//! - Posts-by-user lookup and a like counter
//! - Input validation with stable JSON error bodies
//! - Pluggable repositories (in-memory or JSON file snapshot)
//! - Structured logging

pub mod allocator;
pub mod config;
pub mod dto;
pub mod errors;
pub mod models;
pub mod routes;
pub mod states;
pub mod store;
pub mod validation;

pub use routes::app;
pub use states::AppState;
