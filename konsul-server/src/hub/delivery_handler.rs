use std::sync::Arc;

use async_trait::async_trait;
use konsul_core::{Delivery, DeliveryMode, Handler, HandlerResponse, Inbound, Result, ServerEvent};
use tracing::{info, instrument};

/// Last handler in the chain: pushes the persisted message to clients.
pub struct DeliveryHandler {
    delivery: Arc<dyn Delivery>,
}

impl DeliveryHandler {
    pub fn new(delivery: Arc<dyn Delivery>) -> Self {
        Self { delivery }
    }
}

#[async_trait]
impl Handler for DeliveryHandler {
    #[instrument(skip(self, inbound), fields(message_id = %inbound.message.id))]
    async fn handle(&self, inbound: &Inbound) -> Result<HandlerResponse> {
        let message = &inbound.message;
        let event = ServerEvent::ChatMessage(message.clone());
        let reached = match inbound.delivery {
            DeliveryMode::Broadcast => self.delivery.broadcast(&event).await?,
            DeliveryMode::Participants => {
                self.delivery
                    .deliver_to(&[&message.sender_id, &message.receiver_id], &event)
                    .await?
            }
        };
        info!(reached, mode = ?inbound.delivery, "step: message delivered");
        Ok(HandlerResponse::Delivered(reached))
    }
}
