use crate::store::{MemoryStore, PostRepository, UserRepository};
use std::sync::Arc;

// ============================================================================
// APPLICATION STATE - Shared data across all requests
// ============================================================================
/// Repositories are trait objects so handlers never name a backend. Cloning
/// the state only bumps the `Arc` counts.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
}

impl AppState {
    pub fn new(users: Arc<dyn UserRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { users, posts }
    }

    /// Both collections served from one `MemoryStore`.
    pub fn from_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            posts: store,
        }
    }
}
