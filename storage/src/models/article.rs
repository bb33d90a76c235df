//! Article row. `(name, category)` is unique at the table level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArticleRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub body: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ArticleRecord {
    /// Creates a new record with a generated UUID and current timestamp.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        body: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            category: category.into(),
            body: body.into(),
            image_url,
            created_at: Utc::now(),
        }
    }
}
