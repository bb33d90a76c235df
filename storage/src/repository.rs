use async_trait::async_trait;

use crate::error::StorageError;

/// Id-keyed reads and inserts over one collection.
#[async_trait]
pub trait Repository<T> {
    async fn save(&self, entity: &T) -> Result<(), StorageError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, StorageError>;
    async fn find_all(&self) -> Result<Vec<T>, StorageError>;
}
