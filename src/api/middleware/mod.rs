pub mod auth;
pub mod request_id;

pub use auth::{AdminAuth, AdminContext};
pub use request_id::{RequestId, RequestIdMiddleware};
