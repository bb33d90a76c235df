use async_trait::async_trait;
use konsul_core::{Handler, HandlerResponse, Inbound, Result};
use tracing::{error, instrument};

use crate::aggregator::ChatListAggregator;

/// Records each persisted message in its conversation summary. Runs after persistence and
/// before delivery; a failure here is logged and does not hold back delivery.
pub struct ChatListHandler {
    aggregator: ChatListAggregator,
}

impl ChatListHandler {
    pub fn new(aggregator: ChatListAggregator) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Handler for ChatListHandler {
    #[instrument(skip(self, inbound), fields(message_id = %inbound.message.id))]
    async fn handle(&self, inbound: &Inbound) -> Result<HandlerResponse> {
        let message = &inbound.message;
        if let Err(e) = self
            .aggregator
            .record_message(
                &message.sender_id,
                message.role,
                &message.receiver_id,
                &message.preview(),
                message.created_at,
                message.appointment_id.as_deref(),
            )
            .await
        {
            error!(error = %e, "Failed to update chat list");
        }
        Ok(HandlerResponse::Continue)
    }
}
