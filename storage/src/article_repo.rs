//! Article repository. Duplicate `(name, category)` inserts fail with `AlreadyExists`.

use tracing::info;

use crate::error::StorageResult;
use crate::models::ArticleRecord;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct ArticleRepository {
    pool_manager: SqlitePoolManager,
}

impl ArticleRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }

    pub async fn insert(&self, article: &ArticleRecord) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO articles (id, name, category, body, image_url, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&article.id)
        .bind(&article.name)
        .bind(&article.category)
        .bind(&article.body)
        .bind(&article.image_url)
        .bind(article.created_at)
        .execute(self.pool_manager.pool())
        .await?;

        info!(article_id = %article.id, name = %article.name, category = %article.category, "Saved article");
        Ok(())
    }

    pub async fn exists(&self, name: &str, category: &str) -> StorageResult<bool> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM articles WHERE name = ? AND category = ?")
                .bind(name)
                .bind(category)
                .fetch_one(self.pool_manager.pool())
                .await?;
        Ok(row.0 > 0)
    }

    pub async fn count(&self) -> StorageResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(self.pool_manager.pool())
            .await?;
        Ok(row.0)
    }
}
