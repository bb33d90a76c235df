//! # konsul-server
//!
//! HTTP + WebSocket surface of the consultation chat backend: configuration, the auth gateway,
//! the real-time messaging hub, the article service, routing and the runner that wires the
//! auto-message scheduler in.

pub mod articles;
pub mod auth;
pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod hub;
pub mod routes;
pub mod runner;
pub mod state;

pub use articles::{article_lock_key, ArticleService, NewArticle};
pub use auth::{AuthGateway, Authenticated};
pub use cli::{load_config, Cli, Commands};
pub use components::{build_components, build_components_with_store, ServerComponents};
pub use config::ServerConfig;
pub use error::ApiError;
pub use hub::{ConnectionRegistry, DeliveryHandler, Hub};
pub use runner::{issue_token, run_server, run_tick};
pub use state::AppState;
