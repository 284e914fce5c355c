pub mod app_state;
pub mod rate_limit;
pub mod startup;

pub use app_state::AppState;
pub use rate_limit::{FixedWindowLimiter, RateLimiter};
pub use startup::{configure_routes, start_server, start_server_with_state};
