pub mod auth;
pub mod kayaks;
pub mod middleware;
pub mod protocol;
pub mod rentals;
pub mod reports;
pub mod rest;
pub mod state;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the router and middleware for the binary that serves them.
pub use middleware::require_auth;
pub use rest::{router, ApiDoc};
