use serde::{Deserialize, Serialize};

/// Which directory a profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileKind {
    Citizen,
    Doctor,
}

/// Display data for a citizen or doctor, owned by the (external) account CRUD layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileRecord {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl ProfileRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}
