//! Transport-agnostic seams between the message pipeline and its producers/consumers.
//!
//! [`Delivery`] pushes events to connected clients (implemented by the WebSocket connection
//! registry). [`MessageSink`] accepts a message into the pipeline and returns its persisted form
//! (implemented by the hub; used by the auto-message scheduler).

use async_trait::async_trait;

use crate::error::Result;
use crate::event::ServerEvent;
use crate::types::{ChatMessage, Inbound};

#[async_trait]
pub trait Delivery: Send + Sync {
    /// Sends `event` to every open connection. Returns how many connections accepted it.
    async fn broadcast(&self, event: &ServerEvent) -> Result<usize>;

    /// Sends `event` to every open connection belonging to one of `user_ids`.
    async fn deliver_to(&self, user_ids: &[&str], event: &ServerEvent) -> Result<usize>;

    /// Sends `event` to a single connection. Returns false when it is gone.
    async fn send_to_connection(&self, connection_id: u64, event: &ServerEvent) -> Result<bool>;
}

#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Persists and distributes `inbound.message`. An error means it was not persisted and was
    /// not delivered.
    async fn submit(&self, inbound: Inbound) -> Result<ChatMessage>;
}
