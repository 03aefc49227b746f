pub mod auth;
pub mod request_id;

pub use auth::{verify_jwt, AuthenticatedUser, Claims};
pub use request_id::RequestId;
