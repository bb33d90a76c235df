//! Component factory: builds the shared state, the message chain and the scheduler from config.

use std::sync::Arc;

use anyhow::{Context, Result};
use auto_message::{accepted_channel, AutoMessageScheduler};
use chat_list::{ChatListAggregator, ChatListHandler};
use handler_chain::{ChainSink, HandlerChain};
use keyed_lock::LockManager;
use konsul_core::Delivery;
use middleware::{AuthMiddleware, LoggingMiddleware, PersistenceMiddleware};
use storage::Store;
use tokio::sync::mpsc;
use tracing::{info, instrument};

use crate::articles::ArticleService;
use crate::auth::AuthGateway;
use crate::config::ServerConfig;
use crate::hub::{ConnectionRegistry, DeliveryHandler, Hub};
use crate::state::AppState;

/// Queued accept notifications before the scheduler falls back to its periodic refresh.
const ACCEPTED_QUEUE: usize = 256;

pub struct ServerComponents {
    pub state: Arc<AppState>,
    pub scheduler: Arc<AutoMessageScheduler>,
    /// Accept notifications for [`AutoMessageScheduler::run`].
    pub accepted_rx: mpsc::Receiver<String>,
}

#[instrument(skip(config), fields(database_url = %config.database_url))]
pub async fn build_components(config: &ServerConfig) -> Result<ServerComponents> {
    let store = Store::open(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    build_components_with_store(config, store)
}

/// Logging → auth → persistence, then chat list → delivery.
pub fn build_handler_chain(
    store: &Store,
    aggregator: ChatListAggregator,
    delivery: Arc<dyn Delivery>,
) -> HandlerChain {
    HandlerChain::new()
        .add_middleware(Arc::new(LoggingMiddleware))
        .add_middleware(Arc::new(AuthMiddleware))
        .add_middleware(Arc::new(PersistenceMiddleware::new(store.messages.clone())))
        .add_handler(Arc::new(ChatListHandler::new(aggregator)))
        .add_handler(Arc::new(DeliveryHandler::new(delivery)))
}

/// Builds everything on top of an already opened store (tests pass an in-memory one).
pub fn build_components_with_store(config: &ServerConfig, store: Store) -> Result<ServerComponents> {
    let locks = Arc::new(LockManager::new());
    let registry = Arc::new(ConnectionRegistry::new());
    let aggregator = ChatListAggregator::new(&store);

    let chain = build_handler_chain(&store, aggregator.clone(), registry.clone());
    let sink = Arc::new(ChainSink::new(chain));
    let hub = Hub::new(
        store.messages.clone(),
        registry,
        sink,
        config.chat_history_limit,
    );

    let scheduler = Arc::new(AutoMessageScheduler::new(
        store.appointments.clone(),
        hub.sink(),
        locks.clone(),
        config.scheduler_config()?,
    ));
    let (accepted, accepted_rx) = accepted_channel(ACCEPTED_QUEUE);

    let state = Arc::new(AppState {
        articles: ArticleService::new(store.articles.clone(), locks, config.lock_wait()),
        auth: AuthGateway::new(&config.jwt_secret),
        chat_lists: aggregator,
        hub,
        store,
        accepted,
    });

    info!("step: server components built");
    Ok(ServerComponents {
        state,
        scheduler,
        accepted_rx,
    })
}
