//! Citizen and doctor display profiles.

use crate::error::StorageResult;
use crate::models::{ProfileKind, ProfileRecord};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct DirectoryRepository {
    pool_manager: SqlitePoolManager,
}

impl DirectoryRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }

    pub async fn upsert(&self, kind: ProfileKind, profile: &ProfileRecord) -> StorageResult<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (id, name, avatar_url) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, avatar_url = excluded.avatar_url
            "#,
            table(kind)
        );
        sqlx::query(&sql)
            .bind(&profile.id)
            .bind(&profile.name)
            .bind(&profile.avatar_url)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(())
    }

    pub async fn find(&self, kind: ProfileKind, id: &str) -> StorageResult<Option<ProfileRecord>> {
        let sql = format!("SELECT id, name, avatar_url FROM {} WHERE id = ?", table(kind));
        let profile = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(profile)
    }

    /// Looks `id` up among citizens first, then doctors.
    pub async fn resolve(&self, id: &str) -> StorageResult<Option<(ProfileKind, ProfileRecord)>> {
        for kind in [ProfileKind::Citizen, ProfileKind::Doctor] {
            if let Some(profile) = self.find(kind, id).await? {
                return Ok(Some((kind, profile)));
            }
        }
        Ok(None)
    }
}

fn table(kind: ProfileKind) -> &'static str {
    match kind {
        ProfileKind::Citizen => "citizens",
        ProfileKind::Doctor => "doctors",
    }
}
