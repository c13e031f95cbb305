use super::{PostRepository, StoreError, StoreResult, UserRepository};
use crate::models::{Post, PostChanges, User, UserChanges};
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Document store backed by concurrent maps.
///
/// Lock order is always `users` then `email_index`, never the reverse.
/// When opened on a file, every mutation rewrites a JSON snapshot of both
/// collections.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<u64, User>>,
    posts: Arc<DashMap<u64, Post>>,
    email_index: Arc<DashMap<String, u64>>, // unique index on users.email
    snapshot: Option<Arc<Snapshot>>,
}

struct Snapshot {
    path: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Documents {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    posts: Vec<Post>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store persisted at `path`, loading it if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let documents: Documents = serde_json::from_slice(&bytes)?;
                store.load(documents)?;
                info!(
                    path = %path.display(),
                    users = store.users.len(),
                    posts = store.posts.len(),
                    "Loaded snapshot"
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No snapshot yet, starting empty");
            }
            Err(e) => return Err(e.into()),
        }

        store.snapshot = Some(Arc::new(Snapshot {
            path,
            write_lock: Mutex::new(()),
        }));
        Ok(store)
    }

    fn load(&self, documents: Documents) -> StoreResult<()> {
        for user in documents.users {
            if self.email_index.insert(user.email.clone(), user.id).is_some() {
                return Err(StoreError::DuplicateKey { field: "email" });
            }
            if self.users.insert(user.id, user).is_some() {
                return Err(StoreError::DuplicateKey { field: "_id" });
            }
        }
        for post in documents.posts {
            if self.posts.insert(post.id, post).is_some() {
                return Err(StoreError::DuplicateKey { field: "_id" });
            }
        }
        Ok(())
    }

    fn documents(&self) -> Documents {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        let mut posts: Vec<Post> = self.posts.iter().map(|e| e.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        posts.sort_by_key(|p| p.id);
        Documents { users, posts }
    }

    /// Rewrites the snapshot file, if any. Written to a sibling temp file and
    /// renamed so a crash never leaves a half-written snapshot.
    async fn persist(&self) -> StoreResult<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        let _guard = snapshot.write_lock.lock().await;
        let bytes = serde_json::to_vec_pretty(&self.documents())?;
        let tmp = snapshot.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &snapshot.path).await?;
        debug!(path = %snapshot.path.display(), "Snapshot written");
        Ok(())
    }

    /// Persists a mutation that is already applied to the maps. If the
    /// snapshot cannot be written, `undo` reverts it so a failed call leaves
    /// nothing behind.
    async fn commit(&self, undo: impl FnOnce() + Send) -> StoreResult<()> {
        if let Err(e) = self.persist().await {
            warn!(error = %e, "Snapshot write failed, rolling back");
            undo();
            return Err(e);
        }
        Ok(())
    }

    /// Puts `previous` back in place of the user that currently has its id,
    /// moving the email index entry back with it.
    fn restore_user(&self, previous: User, current_email: &str) {
        let id = previous.id;
        if current_email != previous.email {
            self.email_index
                .remove_if(current_email, |_, owner| *owner == id);
            self.email_index.insert(previous.email.clone(), id);
        }
        if let Some(mut user) = self.users.get_mut(&id) {
            *user = previous;
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_all(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn find_ids(&self) -> StoreResult<Vec<u64>> {
        Ok(self.users.iter().map(|e| *e.key()).collect())
    }

    async fn find_one(&self, id: u64) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let Some(id) = self.email_index.get(email).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn insert(&self, user: User) -> StoreResult<User> {
        match self.users.entry(user.id) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateKey { field: "_id" }),
            Entry::Vacant(slot) => {
                match self.email_index.entry(user.email.clone()) {
                    Entry::Occupied(_) => {
                        return Err(StoreError::DuplicateKey { field: "email" });
                    }
                    Entry::Vacant(email_slot) => {
                        email_slot.insert(user.id);
                    }
                }
                slot.insert(user.clone());
            }
        }

        self.commit(|| {
            self.users.remove(&user.id);
            self.email_index
                .remove_if(&user.email, |_, owner| *owner == user.id);
        })
        .await?;
        Ok(user)
    }

    async fn find_one_and_update(
        &self,
        id: u64,
        changes: UserChanges,
    ) -> StoreResult<Option<User>> {
        let (previous, updated) = {
            let Some(mut user) = self.users.get_mut(&id) else {
                return Ok(None);
            };
            let previous = user.value().clone();

            if let Some(email) = changes.email.as_ref().filter(|e| **e != user.email) {
                match self.email_index.entry(email.clone()) {
                    Entry::Occupied(_) => {
                        return Err(StoreError::DuplicateKey { field: "email" });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                }
                self.email_index.remove(&user.email);
            }

            changes.apply(&mut user);
            (previous, user.value().clone())
        };

        self.commit(|| self.restore_user(previous, &updated.email))
            .await?;
        Ok(Some(updated))
    }

    async fn find_one_and_delete(&self, id: u64) -> StoreResult<Option<User>> {
        let Some((_, user)) = self.users.remove(&id) else {
            return Ok(None);
        };
        self.email_index.remove_if(&user.email, |_, owner| *owner == id);

        self.commit(|| {
            self.email_index.entry(user.email.clone()).or_insert(id);
            self.users.entry(id).or_insert_with(|| user.clone());
        })
        .await?;
        Ok(Some(user))
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn find_all(&self) -> StoreResult<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.iter().map(|e| e.value().clone()).collect();
        posts.sort_by_key(|p| p.id);
        Ok(posts)
    }

    async fn find_ids(&self) -> StoreResult<Vec<u64>> {
        Ok(self.posts.iter().map(|e| *e.key()).collect())
    }

    async fn find_by_user_id(&self, user_id: u64) -> StoreResult<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|e| e.value().user_id == user_id)
            .map(|e| e.value().clone())
            .collect();
        posts.sort_by_key(|p| p.id);
        Ok(posts)
    }

    async fn find_one(&self, id: u64) -> StoreResult<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.value().clone()))
    }

    async fn insert(&self, post: Post) -> StoreResult<Post> {
        match self.posts.entry(post.id) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateKey { field: "_id" }),
            Entry::Vacant(slot) => {
                slot.insert(post.clone());
            }
        }

        self.commit(|| {
            self.posts.remove(&post.id);
        })
        .await?;
        Ok(post)
    }

    async fn find_one_and_update(
        &self,
        id: u64,
        changes: PostChanges,
    ) -> StoreResult<Option<Post>> {
        let (previous, updated) = match self.posts.get_mut(&id) {
            Some(mut post) => {
                let previous = post.value().clone();
                changes.apply(&mut post);
                (previous, post.value().clone())
            }
            None => return Ok(None),
        };

        self.commit(|| {
            if let Some(mut post) = self.posts.get_mut(&id) {
                *post = previous;
            }
        })
        .await?;
        Ok(Some(updated))
    }

    async fn increment_likes(&self, id: u64) -> StoreResult<Option<Post>> {
        let updated = match self.posts.get_mut(&id) {
            Some(mut post) => {
                post.like_count = post.like_count.saturating_add(1);
                post.value().clone()
            }
            None => return Ok(None),
        };

        // Take back only our like; others may have landed meanwhile.
        self.commit(|| {
            if let Some(mut post) = self.posts.get_mut(&id) {
                post.like_count = post.like_count.saturating_sub(1);
            }
        })
        .await?;
        Ok(Some(updated))
    }

    async fn find_one_and_delete(&self, id: u64) -> StoreResult<Option<Post>> {
        let Some((_, post)) = self.posts.remove(&id) else {
            return Ok(None);
        };

        self.commit(|| {
            self.posts.entry(id).or_insert_with(|| post.clone());
        })
        .await?;
        Ok(Some(post))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, email: &str) -> User {
        User {
            id,
            name: format!("user {id}"),
            email: email.into(),
            phone: "555".into(),
            password: "pw".into(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, user(1, "a@b.c")).await.unwrap();

        let err = UserRepository::insert(&store, user(2, "a@b.c"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { field: "email" }));
        assert!(UserRepository::find_one(&store, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id_without_claiming_email() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, user(1, "a@b.c")).await.unwrap();

        let err = UserRepository::insert(&store, user(1, "x@y.z"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { field: "_id" }));
        assert!(store.find_by_email("x@y.z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_change_moves_the_index() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, user(1, "old@b.c")).await.unwrap();

        let changes = UserChanges {
            email: Some("new@b.c".into()),
            ..Default::default()
        };
        let updated = UserRepository::find_one_and_update(&store, 1, changes)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.email, "new@b.c");
        assert!(store.find_by_email("old@b.c").await.unwrap().is_none());
        assert_eq!(store.find_by_email("new@b.c").await.unwrap().unwrap().id, 1);

        // The old address is free again.
        UserRepository::insert(&store, user(2, "old@b.c")).await.unwrap();
    }

    #[tokio::test]
    async fn email_change_to_taken_address_fails() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, user(1, "one@b.c")).await.unwrap();
        UserRepository::insert(&store, user(2, "two@b.c")).await.unwrap();

        let changes = UserChanges {
            email: Some("one@b.c".into()),
            ..Default::default()
        };
        let err = UserRepository::find_one_and_update(&store, 2, changes)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { field: "email" }));
        let unchanged = UserRepository::find_one(&store, 2).await.unwrap().unwrap();
        assert_eq!(unchanged.email, "two@b.c");
    }

    #[tokio::test]
    async fn delete_releases_the_email() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, user(1, "a@b.c")).await.unwrap();

        let deleted = UserRepository::find_one_and_delete(&store, 1).await.unwrap();
        assert_eq!(deleted.map(|u| u.id), Some(1));
        assert!(store.find_by_email("a@b.c").await.unwrap().is_none());
        assert!(UserRepository::find_one_and_delete(&store, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn posts_filter_by_author_in_id_order() {
        let store = MemoryStore::new();
        for (id, author) in [(3, 1), (1, 1), (2, 2)] {
            PostRepository::insert(&store, Post::new(id, author, format!("post {id}")))
                .await
                .unwrap();
        }

        let ids: Vec<u64> = store
            .find_by_user_id(1)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(ids, vec![1, 3]);
        assert!(store.find_by_user_id(9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn increment_likes_adds_one_per_call() {
        let store = MemoryStore::new();
        PostRepository::insert(&store, Post::new(1, 1, "hi".into()))
            .await
            .unwrap();

        for _ in 0..3 {
            store.increment_likes(1).await.unwrap();
        }

        let post = PostRepository::find_one(&store, 1).await.unwrap().unwrap();
        assert_eq!(post.like_count, 3);
        assert!(store.increment_likes(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let store = MemoryStore::open(&path).await.unwrap();
        UserRepository::insert(&store, user(1, "a@b.c")).await.unwrap();
        PostRepository::insert(&store, Post::new(1, 1, "hi".into()))
            .await
            .unwrap();
        store.increment_likes(1).await.unwrap();

        let reopened = MemoryStore::open(&path).await.unwrap();
        let users = UserRepository::find_all(&reopened).await.unwrap();
        let post = PostRepository::find_one(&reopened, 1).await.unwrap().unwrap();

        assert_eq!(users, vec![user(1, "a@b.c")]);
        assert_eq!(post.like_count, 1);
        assert!(reopened.find_by_email("a@b.c").await.unwrap().is_some());
    }

    /// A store whose snapshot directory disappears after seeding, so every
    /// later write fails.
    async fn store_losing_its_directory() -> (tempfile::TempDir, MemoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let store = MemoryStore::open(sub.join("db.json")).await.unwrap();
        UserRepository::insert(&store, user(1, "a@b.c")).await.unwrap();
        PostRepository::insert(&store, Post::new(1, 1, "hi".into()))
            .await
            .unwrap();

        std::fs::remove_dir_all(&sub).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn failed_user_writes_leave_no_trace() {
        let (_dir, store) = store_losing_its_directory().await;

        let err = UserRepository::insert(&store, user(2, "x@y.z"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(UserRepository::find_one(&store, 2).await.unwrap().is_none());
        assert!(store.find_by_email("x@y.z").await.unwrap().is_none());

        let changes = UserChanges {
            name: Some("renamed".into()),
            email: Some("new@b.c".into()),
            ..Default::default()
        };
        assert!(
            UserRepository::find_one_and_update(&store, 1, changes)
                .await
                .is_err()
        );
        assert_eq!(
            UserRepository::find_one(&store, 1).await.unwrap(),
            Some(user(1, "a@b.c"))
        );
        assert!(store.find_by_email("new@b.c").await.unwrap().is_none());
        assert_eq!(store.find_by_email("a@b.c").await.unwrap().unwrap().id, 1);

        assert!(UserRepository::find_one_and_delete(&store, 1).await.is_err());
        assert_eq!(
            UserRepository::find_one(&store, 1).await.unwrap(),
            Some(user(1, "a@b.c"))
        );
        assert!(store.find_by_email("a@b.c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_post_writes_leave_no_trace() {
        let (_dir, store) = store_losing_its_directory().await;
        let before = PostRepository::find_one(&store, 1).await.unwrap().unwrap();

        assert!(
            PostRepository::insert(&store, Post::new(2, 1, "new".into()))
                .await
                .is_err()
        );
        assert!(PostRepository::find_one(&store, 2).await.unwrap().is_none());

        let changes = PostChanges {
            content: Some("edited".into()),
            like_count: Some(9),
        };
        assert!(
            PostRepository::find_one_and_update(&store, 1, changes)
                .await
                .is_err()
        );
        assert!(store.increment_likes(1).await.is_err());
        assert!(PostRepository::find_one_and_delete(&store, 1).await.is_err());

        assert_eq!(
            PostRepository::find_one(&store, 1).await.unwrap(),
            Some(before)
        );
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(matches!(
            MemoryStore::open(&path).await,
            Err(StoreError::Serialization(_))
        ));
    }
}
