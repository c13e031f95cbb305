use crate::{
    AppState,
    allocator::next_id,
    dto::{CreateUserRequest, MessageResponse, UpdateUserRequest},
    errors::{ApiError, DUPLICATE_EMAIL, Entity},
    models::{User, UserChanges},
    validation::{INVALID_BODY, check, parse_id},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

/// GET /users
pub async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .users
        .find_all()
        .await
        .map_err(|e| ApiError::from_store("fetching users", e))?;

    Ok(Json(users))
}

/// POST /users
/// Body: { "name": "...", "email": "...", "phone": "...", "password": "..." }
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    const ACTION: &str = "creating the user";

    let Json(payload) = payload.map_err(|_| ApiError::ValidationError(INVALID_BODY.into()))?;
    let (name, email, phone, password) = payload
        .required_fields()
        .ok_or_else(|| ApiError::ValidationError(CreateUserRequest::REQUIRED.into()))?;
    check(&payload)?;

    let existing = state
        .users
        .find_by_email(email)
        .await
        .map_err(|e| ApiError::from_store(ACTION, e))?;
    if existing.is_some() {
        return Err(ApiError::Conflict(DUPLICATE_EMAIL.into()));
    }

    // Scan-then-insert: a concurrent create can pick the same id, in which
    // case the store rejects the second insert.
    let ids = state
        .users
        .find_ids()
        .await
        .map_err(|e| ApiError::from_store(ACTION, e))?;
    let id = next_id(ids).ok_or_else(|| ApiError::internal(ACTION, "user id space exhausted"))?;

    let user = User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        password: password.to_string(),
    };
    let user = state
        .users
        .insert(user)
        .await
        .map_err(|e| ApiError::from_store(ACTION, e))?;

    info!("User created: {} <{}>", user.id, user.email);

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id, Entity::User)?;

    let user = state
        .users
        .find_one(id)
        .await
        .map_err(|e| ApiError::from_store("fetching the user", e))?
        .ok_or(ApiError::NotFound(Entity::User))?;

    Ok(Json(user))
}

/// PUT /users/{id}
/// Body: any subset of { "name", "email", "phone", "password" }
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id, Entity::User)?;
    let Json(payload) = payload.map_err(|_| ApiError::ValidationError(INVALID_BODY.into()))?;
    check(&payload)?;

    let changes = UserChanges {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        password: payload.password,
    };

    let user = state
        .users
        .find_one_and_update(id, changes)
        .await
        .map_err(|e| ApiError::from_store("updating the user", e))?
        .ok_or(ApiError::NotFound(Entity::User))?;

    Ok(Json(user))
}

/// DELETE /users/{id}
///
/// Posts written by the user are left in place.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, Entity::User)?;

    state
        .users
        .find_one_and_delete(id)
        .await
        .map_err(|e| ApiError::from_store("deleting the user", e))?
        .ok_or(ApiError::NotFound(Entity::User))?;

    info!("User deleted: {}", id);

    Ok(Json(MessageResponse::new("User deleted successfully")))
}
