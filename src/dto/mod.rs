mod requests;
mod responses;

pub use requests::{CreatePostRequest, CreateUserRequest, UpdatePostRequest, UpdateUserRequest};
pub use responses::{HealthResponse, MessageResponse};
