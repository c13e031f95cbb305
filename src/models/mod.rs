mod post;
mod user;

pub use post::{Post, PostChanges};
pub use user::{User, UserChanges};
