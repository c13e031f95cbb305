//! Persistence seam. Handlers only see these traits, so any backend (or a
//! failing fake in tests) can be injected through `AppState`.

mod memory;

pub use memory::MemoryStore;

use crate::models::{Post, PostChanges, User, UserChanges};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique key `{field}`")]
    DuplicateKey { field: &'static str },
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The `users` collection.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_all(&self) -> StoreResult<Vec<User>>;

    /// Identifier projection used by the allocator.
    async fn find_ids(&self) -> StoreResult<Vec<u64>>;

    async fn find_one(&self, id: u64) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fails with `DuplicateKey` when the `_id` or the email is taken.
    async fn insert(&self, user: User) -> StoreResult<User>;

    /// Returns the updated document, or `None` if no user has this id.
    async fn find_one_and_update(&self, id: u64, changes: UserChanges)
    -> StoreResult<Option<User>>;

    async fn find_one_and_delete(&self, id: u64) -> StoreResult<Option<User>>;
}

/// The `posts` collection.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_all(&self) -> StoreResult<Vec<Post>>;

    async fn find_ids(&self) -> StoreResult<Vec<u64>>;

    async fn find_by_user_id(&self, user_id: u64) -> StoreResult<Vec<Post>>;

    async fn find_one(&self, id: u64) -> StoreResult<Option<Post>>;

    /// Fails with `DuplicateKey` when the `_id` is taken.
    async fn insert(&self, post: Post) -> StoreResult<Post>;

    async fn find_one_and_update(&self, id: u64, changes: PostChanges)
    -> StoreResult<Option<Post>>;

    /// Atomically adds one to `likeCount` and returns the new document.
    async fn increment_likes(&self, id: u64) -> StoreResult<Option<Post>>;

    async fn find_one_and_delete(&self, id: u64) -> StoreResult<Option<Post>>;
}
