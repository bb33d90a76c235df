//! Middleware for the chat message chain.
//!
//! - [`LoggingMiddleware`] logs every message and the final response.
//! - [`AuthMiddleware`] checks that a connection only speaks for its own user.
//! - [`PersistenceMiddleware`] stores the message before any handler sees it.

mod middleware;
mod persistence_middleware;

pub use middleware::{AuthMiddleware, LoggingMiddleware};
pub use persistence_middleware::PersistenceMiddleware;

#[cfg(test)]
mod test;
