use async_trait::async_trait;
use konsul_core::{HandlerError, HandlerResponse, Inbound, Middleware, Origin, Result, Role};
use tracing::{debug, info, instrument, warn};

pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    #[instrument(skip(self, inbound))]
    async fn before(&self, inbound: &Inbound) -> Result<bool> {
        let message = &inbound.message;
        info!(
            message_id = %message.id,
            sender_id = %message.sender_id,
            receiver_id = %message.receiver_id,
            message_type = message.message_type.as_str(),
            connection_id = ?inbound.connection_id(),
            "Received message"
        );
        Ok(true)
    }

    #[instrument(skip(self, inbound, response))]
    async fn after(&self, inbound: &Inbound, response: &HandlerResponse) -> Result<()> {
        debug!(
            message_id = %inbound.message.id,
            response = ?response,
            "Processed message"
        );
        Ok(())
    }
}

/// Rejects connection messages whose sender or role does not match the authenticated user.
/// System messages pass untouched.
pub struct AuthMiddleware;

#[async_trait]
impl Middleware for AuthMiddleware {
    #[instrument(skip(self, inbound))]
    async fn before(&self, inbound: &Inbound) -> Result<bool> {
        let user = match &inbound.origin {
            Origin::System => return Ok(true),
            Origin::Connection { user, .. } => user,
        };
        let message = &inbound.message;

        if message.sender_id != user.id {
            warn!(
                user_id = %user.id,
                sender_id = %message.sender_id,
                "Sender does not match connection user"
            );
            return Err(HandlerError::SenderMismatch {
                expected: user.id.clone(),
                actual: message.sender_id.clone(),
            }
            .into());
        }

        if user.role != Role::Admin && user.chat_role() != Some(message.role) {
            warn!(
                user_id = %user.id,
                role = %user.role,
                message_role = message.role.as_str(),
                "Message role does not match account role"
            );
            return Err(HandlerError::Unauthorized.into());
        }

        Ok(true)
    }

    async fn after(&self, _inbound: &Inbound, _response: &HandlerResponse) -> Result<()> {
        Ok(())
    }
}
