use async_trait::async_trait;
use konsul_core::{HandlerResponse, Inbound, KonsulError, Middleware, Result};
use storage::{ChatMessageRecord, ChatRepository};
use tracing::{error, info, instrument};

/// Saves the message in `before`; a failed save aborts the chain so nothing is delivered.
#[derive(Clone)]
pub struct PersistenceMiddleware {
    repo: ChatRepository,
}

impl PersistenceMiddleware {
    pub fn new(repo: ChatRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Middleware for PersistenceMiddleware {
    #[instrument(skip(self, inbound))]
    async fn before(&self, inbound: &Inbound) -> Result<bool> {
        let message = &inbound.message;
        message.validate()?;

        let record = ChatMessageRecord::from(message);
        self.repo.save(&record).await.map_err(|e| {
            error!(error = %e, message_id = %message.id, "Failed to save message");
            KonsulError::from(e)
        })?;

        info!(message_id = %message.id, "step: PersistenceMiddleware before done, message saved");
        Ok(true)
    }

    async fn after(&self, _inbound: &Inbound, _response: &HandlerResponse) -> Result<()> {
        Ok(())
    }
}
