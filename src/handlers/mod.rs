// Account routes under /api/users
pub mod account_handler;

// Bearer-token route guard
pub mod guard;
pub use guard::AuthenticatedAccount;

// Health check handler
pub mod health;
