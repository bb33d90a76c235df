//! Server configuration loaded from env (after `.env`).

mod server_config;


pub use server_config::ServerConfig;
