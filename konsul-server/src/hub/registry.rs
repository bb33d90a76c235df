//! Open WebSocket connections, keyed by connection id and looked up by user id.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use konsul_core::{AuthUser, Delivery, Result, ServerEvent};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Events queued per connection before it counts as stalled.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

struct Connection {
    user: AuthUser,
    tx: mpsc::Sender<ServerEvent>,
}

enum Push {
    Sent,
    Closed,
    Full,
}

impl Connection {
    fn send(&self, event: &ServerEvent) -> Push {
        match self.tx.try_send(event.clone()) {
            Ok(()) => Push::Sent,
            Err(TrySendError::Full(_)) => Push::Full,
            Err(TrySendError::Closed(_)) => Push::Closed,
        }
    }
}

/// Each connection owns a bounded queue drained by its writer task. Pushing never waits: a
/// connection whose queue is full is dropped, which ends its writer and closes the socket.
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    capacity: usize,
    connections: RwLock<HashMap<u64, Connection>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            capacity: capacity.max(1),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a connection for `user`. `initial` is queued before the connection becomes visible
    /// to deliveries, so it is always received first.
    pub async fn register(
        &self,
        user: AuthUser,
        initial: Vec<ServerEvent>,
    ) -> (u64, mpsc::Receiver<ServerEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(self.capacity.max(initial.len()));
        for event in initial {
            // rx is alive and the queue fits `initial`
            let _ = tx.try_send(event);
        }
        let user_id = user.id.clone();
        let mut connections = self.connections.write().await;
        connections.insert(id, Connection { user, tx });
        info!(connection_id = id, user_id = %user_id, total = connections.len(), "Client connected");
        (id, rx)
    }

    pub async fn unregister(&self, connection_id: u64) -> Option<AuthUser> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&connection_id).map(|c| c.user);
        if let Some(user) = &removed {
            info!(connection_id, user_id = %user.id, total = connections.len(), "Client disconnected");
        }
        removed
    }

    /// Distinct ids of connected users, sorted.
    pub async fn online_users(&self) -> Vec<String> {
        let connections = self.connections.read().await;
        connections
            .values()
            .map(|c| c.user.id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        let connections = self.connections.read().await;
        connections.values().any(|c| c.user.id == user_id)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Queues `event` on every connection `target` accepts and returns how many took it.
    async fn push<F>(&self, event: &ServerEvent, target: F) -> usize
    where
        F: Fn(u64, &Connection) -> bool,
    {
        let mut reached = 0;
        let mut stalled = Vec::new();
        {
            let connections = self.connections.read().await;
            for (id, connection) in connections.iter().filter(|(id, c)| target(**id, *c)) {
                match connection.send(event) {
                    Push::Sent => reached += 1,
                    Push::Full => stalled.push(*id),
                    Push::Closed => {}
                }
            }
        }
        if !stalled.is_empty() {
            let mut connections = self.connections.write().await;
            for id in stalled {
                if let Some(dropped) = connections.remove(&id) {
                    warn!(
                        connection_id = id,
                        user_id = %dropped.user.id,
                        capacity = self.capacity,
                        "Outbound queue full, dropping connection"
                    );
                }
            }
        }
        reached
    }
}

#[async_trait]
impl Delivery for ConnectionRegistry {
    async fn broadcast(&self, event: &ServerEvent) -> Result<usize> {
        let reached = self.push(event, |_, _| true).await;
        debug!(event = event.name(), reached, "broadcast");
        Ok(reached)
    }

    async fn deliver_to(&self, user_ids: &[&str], event: &ServerEvent) -> Result<usize> {
        let reached = self
            .push(event, |_, c| user_ids.contains(&c.user.id.as_str()))
            .await;
        debug!(event = event.name(), reached, "delivered to participants");
        Ok(reached)
    }

    async fn send_to_connection(&self, connection_id: u64, event: &ServerEvent) -> Result<bool> {
        Ok(self.push(event, |id, _| id == connection_id).await > 0)
    }
}
