//! Storage crate: persistence for appointments, chat messages, chat lists, profiles and articles.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – Row records and their conversions
//! - [`repository`] – Repository trait
//! - [`chat_repo`] – ChatRepository (append-only messages)
//! - [`chat_list_repo`] – ChatListRepository (conversation summaries, unread counters)
//! - [`appointment_repo`] – AppointmentRepository
//! - [`directory_repo`] – DirectoryRepository (citizen/doctor profiles)
//! - [`article_repo`] – ArticleRepository
//! - [`sqlite_pool`] – SqlitePoolManager
//! - [`schema`] – table creation

mod appointment_repo;
mod article_repo;
mod chat_list_repo;
mod chat_repo;
mod directory_repo;
mod error;
mod models;
mod repository;
mod schema;
mod sqlite_pool;

pub use appointment_repo::AppointmentRepository;
pub use article_repo::ArticleRepository;
pub use chat_list_repo::ChatListRepository;
pub use chat_repo::ChatRepository;
pub use directory_repo::DirectoryRepository;
pub use error::{StorageError, StorageResult};
pub use models::{
    AppointmentRecord, AppointmentStatus, ArticleRecord, ChatListRecord, ChatListStatus,
    ChatMessageRecord, PendingGreeting, ProfileKind, ProfileRecord,
};
pub use repository::Repository;
pub use schema::migrate;
pub use sqlite_pool::SqlitePoolManager;

/// Every repository over one shared pool.
#[derive(Clone)]
pub struct Store {
    pool_manager: SqlitePoolManager,
    pub messages: ChatRepository,
    pub chat_lists: ChatListRepository,
    pub appointments: AppointmentRepository,
    pub directory: DirectoryRepository,
    pub articles: ArticleRepository,
}

impl Store {
    /// Connects to `database_url`, creates missing tables and builds the repositories.
    pub async fn open(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        migrate(&pool_manager).await?;
        Ok(Self::from_pool(pool_manager))
    }

    pub fn from_pool(pool_manager: SqlitePoolManager) -> Self {
        Self {
            messages: ChatRepository::new(pool_manager.clone()),
            chat_lists: ChatListRepository::new(pool_manager.clone()),
            appointments: AppointmentRepository::new(pool_manager.clone()),
            directory: DirectoryRepository::new(pool_manager.clone()),
            articles: ArticleRepository::new(pool_manager.clone()),
            pool_manager,
        }
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        self.pool_manager.pool()
    }
}
