//! Server config: bind address, database, logging, auth secret, hub and scheduler knobs.

use anyhow::{Context, Result};
use auto_message::{parse_utc_offset, SchedulerConfig, DEFAULT_GREETING};
use chrono::FixedOffset;
use konsul_core::LogFormat;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// BIND_ADDR
    pub bind_addr: String,
    /// DATABASE_URL (file path, `sqlite:` URL or `sqlite::memory:`)
    pub database_url: String,
    /// LOG_FILE
    pub log_file: String,
    /// LOG_FORMAT: pretty | json
    pub log_format: LogFormat,
    /// JWT_SECRET, HS256 signing key shared with the issuing service
    pub jwt_secret: String,
    /// CHAT_HISTORY_LIMIT: messages replayed to a new connection
    pub chat_history_limit: i64,
    /// AUTO_MESSAGE_REFRESH_SECS
    pub auto_message_refresh_secs: u64,
    /// SCHEDULE_UTC_OFFSET: offset appointment date/time are stored in
    pub schedule_utc_offset: String,
    /// AUTO_MESSAGE_TEXT
    pub auto_message_text: String,
    /// LOCK_WAIT_TIMEOUT_SECS
    pub lock_wait_timeout_secs: u64,
}

impl ServerConfig {
    /// Defaults for everything except the secret.
    pub fn with_defaults(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: "konsul.db".to_string(),
            log_file: "logs/konsul.log".to_string(),
            log_format: LogFormat::Pretty,
            jwt_secret: jwt_secret.into(),
            chat_history_limit: 50,
            auto_message_refresh_secs: 30 * 60,
            schedule_utc_offset: "+07:00".to_string(),
            auto_message_text: DEFAULT_GREETING.to_string(),
            lock_wait_timeout_secs: 10,
        }
    }

    /// Load from environment variables. `bind` overrides BIND_ADDR if provided.
    pub fn load(bind: Option<String>) -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;
        let mut config = Self::with_defaults(jwt_secret);

        if let Some(addr) = bind.or_else(|| env::var("BIND_ADDR").ok()) {
            config.bind_addr = addr;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(path) = env::var("LOG_FILE") {
            config.log_file = path;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            config.log_format = format
                .parse()
                .map_err(|e: String| anyhow::anyhow!("LOG_FORMAT: {}", e))?;
        }
        if let Some(limit) = parse_var("CHAT_HISTORY_LIMIT")? {
            config.chat_history_limit = limit;
        }
        if let Some(secs) = parse_var("AUTO_MESSAGE_REFRESH_SECS")? {
            config.auto_message_refresh_secs = secs;
        }
        if let Ok(offset) = env::var("SCHEDULE_UTC_OFFSET") {
            config.schedule_utc_offset = offset;
        }
        if let Ok(text) = env::var("AUTO_MESSAGE_TEXT") {
            config.auto_message_text = text;
        }
        if let Some(secs) = parse_var("LOCK_WAIT_TIMEOUT_SECS")? {
            config.lock_wait_timeout_secs = secs;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("BIND_ADDR is not a socket address: {}", self.bind_addr);
        }
        if self.chat_history_limit <= 0 {
            anyhow::bail!("CHAT_HISTORY_LIMIT must be positive");
        }
        if self.auto_message_refresh_secs == 0 {
            anyhow::bail!("AUTO_MESSAGE_REFRESH_SECS must be positive");
        }
        if self.auto_message_text.trim().is_empty() {
            anyhow::bail!("AUTO_MESSAGE_TEXT must not be empty");
        }
        self.offset()?;
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.schedule_utc_offset)
            .with_context(|| format!("SCHEDULE_UTC_OFFSET: {}", self.schedule_utc_offset))
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_secs(self.lock_wait_timeout_secs)
    }

    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        Ok(SchedulerConfig {
            greeting: self.auto_message_text.clone(),
            offset: self.offset()?,
            refresh_interval: Duration::from_secs(self.auto_message_refresh_secs),
        })
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} is not a valid number: {}", name, raw)),
        Err(_) => Ok(None),
    }
}
