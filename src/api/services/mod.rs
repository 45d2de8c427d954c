pub mod admin;
pub mod health;
pub mod rate_limit;
pub mod tracking;

pub use admin::admin_v1_routes;
pub use health::{AppStartTime, HealthService, health_routes};
pub use tracking::tracking_routes;
