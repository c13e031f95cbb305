use crate::validation::EMAIL_RE;
use serde::Deserialize;
use validator::Validate;

/// Body of `POST /users`. Fields are optional so a missing one can be
/// reported by name instead of failing deserialization.
#[derive(Debug, Default, Validate, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    #[validate(regex(path = *EMAIL_RE, message = "Invalid email format."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

impl CreateUserRequest {
    pub const REQUIRED: &'static str = "All fields (name, email, phone, password) are required.";

    /// The four fields once all are present and non-empty.
    pub fn required_fields(&self) -> Option<(&str, &str, &str, &str)> {
        Some((
            non_empty(&self.name)?,
            non_empty(&self.email)?,
            non_empty(&self.phone)?,
            non_empty(&self.password)?,
        ))
    }
}

/// Body of `PUT /users/{id}`; any subset of the fields.
#[derive(Debug, Default, Validate, Deserialize)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "name cannot be empty."))]
    pub name: Option<String>,
    #[validate(regex(path = *EMAIL_RE, message = "Invalid email format."))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "phone cannot be empty."))]
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "password cannot be empty."))]
    pub password: Option<String>,
}

/// Body of `POST /posts`.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePostRequest {
    pub user_id: Option<u64>,
    pub content: Option<String>,
}

impl CreatePostRequest {
    pub const REQUIRED: &'static str = "user_id and content are required.";

    pub fn required_fields(&self) -> Option<(u64, &str)> {
        let user_id = self.user_id.filter(|id| *id > 0)?;
        Some((user_id, non_empty(&self.content)?))
    }
}

/// Body of `PUT /posts/{id}`; any subset of the fields.
#[derive(Debug, Default, Validate, Deserialize)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, message = "content cannot be empty."))]
    pub content: Option<String>,
    #[serde(rename = "likeCount")]
    pub like_count: Option<u64>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::ApiError, validation::check};

    fn message(result: Result<(), ApiError>) -> String {
        match result {
            Err(ApiError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_user_requires_every_field() {
        let request: CreateUserRequest =
            serde_json::from_str(r#"{"name":"Jane","email":"jane@example.com","phone":"123"}"#)
                .unwrap();
        assert!(request.required_fields().is_none());

        let request: CreateUserRequest = serde_json::from_str(
            r#"{"name":"","email":"jane@example.com","phone":"123","password":"pw"}"#,
        )
        .unwrap();
        assert!(request.required_fields().is_none());
    }

    #[test]
    fn create_user_rejects_bad_email() {
        let request = CreateUserRequest {
            name: Some("Jane".into()),
            email: Some("invalid-email".into()),
            phone: Some("123".into()),
            password: Some("pw".into()),
        };

        assert!(request.required_fields().is_some());
        assert_eq!(message(check(&request)), "Invalid email format.");
    }

    #[test]
    fn update_user_skips_absent_email() {
        let request: UpdateUserRequest = serde_json::from_str(r#"{"name":"Janet"}"#).unwrap();
        assert!(check(&request).is_ok());
    }

    #[test]
    fn update_user_rejects_empty_values() {
        let request: UpdateUserRequest = serde_json::from_str(r#"{"phone":""}"#).unwrap();
        assert_eq!(message(check(&request)), "phone cannot be empty.");

        let request: UpdateUserRequest = serde_json::from_str(r#"{"email":"nope"}"#).unwrap();
        assert_eq!(message(check(&request)), "Invalid email format.");
    }

    #[test]
    fn create_post_treats_zero_user_id_as_missing() {
        let request: CreatePostRequest =
            serde_json::from_str(r#"{"user_id":0,"content":"hi"}"#).unwrap();
        assert!(request.required_fields().is_none());

        let request: CreatePostRequest =
            serde_json::from_str(r#"{"user_id":3,"content":"hi"}"#).unwrap();
        assert_eq!(request.required_fields(), Some((3, "hi")));
    }

    #[test]
    fn update_post_reads_like_count_wire_name() {
        let request: UpdatePostRequest = serde_json::from_str(r#"{"likeCount":5}"#).unwrap();
        assert_eq!(request.like_count, Some(5));
        assert!(request.content.is_none());
    }
}
