use crate::{
    AppState,
    allocator::next_id,
    dto::{CreatePostRequest, MessageResponse, UpdatePostRequest},
    errors::{ApiError, Entity},
    models::{Post, PostChanges},
    validation::{INVALID_BODY, check, parse_id},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

/// GET /posts
pub async fn get_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state
        .posts
        .find_all()
        .await
        .map_err(|e| ApiError::from_store("fetching posts", e))?;

    Ok(Json(posts))
}

/// POST /posts
/// Body: { "user_id": 1, "content": "..." }
///
/// `user_id` is stored as given; the author is not looked up.
pub async fn create_post(
    State(state): State<AppState>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    const ACTION: &str = "creating the post";

    let Json(payload) = payload.map_err(|_| ApiError::ValidationError(INVALID_BODY.into()))?;
    let (user_id, content) = payload
        .required_fields()
        .ok_or_else(|| ApiError::ValidationError(CreatePostRequest::REQUIRED.into()))?;

    let ids = state
        .posts
        .find_ids()
        .await
        .map_err(|e| ApiError::from_store(ACTION, e))?;
    let id = next_id(ids).ok_or_else(|| ApiError::internal(ACTION, "post id space exhausted"))?;

    let post = state
        .posts
        .insert(Post::new(id, user_id, content.to_string()))
        .await
        .map_err(|e| ApiError::from_store(ACTION, e))?;

    info!("Post created: {} by user {}", post.id, post.user_id);

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id, Entity::Post)?;

    let post = state
        .posts
        .find_one(id)
        .await
        .map_err(|e| ApiError::from_store("fetching the post", e))?
        .ok_or(ApiError::NotFound(Entity::Post))?;

    Ok(Json(post))
}

/// GET /users/{id}/posts
///
/// An existing user without posts gets an empty list, not a 404.
pub async fn get_posts_by_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Post>>, ApiError> {
    const ACTION: &str = "fetching the user's posts";

    let user_id = parse_id(&id, Entity::User)?;

    state
        .users
        .find_one(user_id)
        .await
        .map_err(|e| ApiError::from_store(ACTION, e))?
        .ok_or(ApiError::NotFound(Entity::User))?;

    let posts = state
        .posts
        .find_by_user_id(user_id)
        .await
        .map_err(|e| ApiError::from_store(ACTION, e))?;

    Ok(Json(posts))
}

/// PUT /posts/{id}
/// Body: any subset of { "content", "likeCount" }
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id, Entity::Post)?;
    let Json(payload) = payload.map_err(|_| ApiError::ValidationError(INVALID_BODY.into()))?;
    check(&payload)?;

    let changes = PostChanges {
        content: payload.content,
        like_count: payload.like_count,
    };

    let post = state
        .posts
        .find_one_and_update(id, changes)
        .await
        .map_err(|e| ApiError::from_store("updating the post", e))?
        .ok_or(ApiError::NotFound(Entity::Post))?;

    Ok(Json(post))
}

/// POST /posts/{id}/like
///
/// Not idempotent: every call adds one like.
pub async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id(&id, Entity::Post)?;

    let post = state
        .posts
        .increment_likes(id)
        .await
        .map_err(|e| ApiError::from_store("liking the post", e))?
        .ok_or(ApiError::NotFound(Entity::Post))?;

    info!("Post liked: {} now has {} likes", post.id, post.like_count);

    Ok(Json(post))
}

/// DELETE /posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, Entity::Post)?;

    state
        .posts
        .find_one_and_delete(id)
        .await
        .map_err(|e| ApiError::from_store("deleting the post", e))?
        .ok_or(ApiError::NotFound(Entity::Post))?;

    info!("Post deleted: {}", id);

    Ok(Json(MessageResponse::new("Post deleted successfully")))
}
