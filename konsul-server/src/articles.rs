//! Article creation. Concurrent requests for the same name and category are serialized under a
//! keyed lock; the table's unique constraint backs it up.

use std::sync::Arc;
use std::time::Duration;

use keyed_lock::LockManager;
use konsul_core::{AuthUser, Role};
use serde::{Deserialize, Serialize};
use storage::{ArticleRecord, ArticleRepository, StorageError};
use tracing::{info, instrument};

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub name: String,
    pub category: String,
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

pub fn article_lock_key(name: &str, category: &str) -> String {
    format!("art_{}_{}", name, category)
}

#[derive(Clone)]
pub struct ArticleService {
    articles: ArticleRepository,
    locks: Arc<LockManager>,
    lock_wait: Duration,
}

impl ArticleService {
    pub fn new(articles: ArticleRepository, locks: Arc<LockManager>, lock_wait: Duration) -> Self {
        Self {
            articles,
            locks,
            lock_wait,
        }
    }

    #[instrument(skip(self, article, author), fields(author_id = %author.id))]
    pub async fn create(
        &self,
        article: NewArticle,
        author: &AuthUser,
    ) -> Result<ArticleRecord, ApiError> {
        author.require_role(&[Role::Admin, Role::Dokter])?;

        let name = article.name.trim();
        let category = article.category.trim();
        if name.is_empty() || category.is_empty() || article.body.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "name, category and body are required".into(),
            ));
        }

        let key = article_lock_key(name, category);
        let _guard = self
            .locks
            .acquire_timeout(&key, &author.id, self.lock_wait)
            .await?;

        if self.articles.exists(name, category).await? {
            return Err(ApiError::Conflict(format!(
                "article '{}' already exists in '{}'",
                name, category
            )));
        }

        let record = ArticleRecord::new(name, category, article.body, article.image_url);
        match self.articles.insert(&record).await {
            Ok(()) => {
                info!(article_id = %record.id, "step: article created");
                Ok(record)
            }
            Err(StorageError::AlreadyExists(_)) => Err(ApiError::Conflict(format!(
                "article '{}' already exists in '{}'",
                name, category
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
