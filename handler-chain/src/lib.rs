//! # Handler chain
//!
//! Runs a sequence of middleware (before/after) and handlers for each inbound chat message.
//! Middleware and handler `before` can stop the chain; the first handler that returns Stop or
//! Delivered ends handler execution; after callbacks run in reverse order.
//!
//! [`ChainSink`] wraps a chain as a [`MessageSink`] and runs one message at a time, so the
//! persistence order of messages is also their delivery order.

use async_trait::async_trait;
use konsul_core::{
    ChatMessage, Handler, HandlerError, HandlerResponse, Inbound, MessageSink, Middleware, Result,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

/// Chain of middleware and handlers: middleware run in order (before), then handlers; middleware after run in reverse order.
#[derive(Clone, Default)]
pub struct HandlerChain {
    middleware: Vec<Arc<dyn Middleware>>,
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    /// Creates an empty chain (no middleware, no handlers).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware (runs before handlers, after in reverse).
    pub fn add_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Appends a handler (runs in order; first Stop/Delivered ends handler phase).
    pub fn add_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Runs middleware before, handler before, handlers; then handler after and middleware after
    /// in reverse. Returns the first Stop or Delivered, or Continue.
    #[instrument(skip(self, inbound), fields(message_id = %inbound.message.id))]
    pub async fn handle(&self, inbound: &Inbound) -> Result<HandlerResponse> {
        let message = &inbound.message;
        info!(
            sender_id = %message.sender_id,
            receiver_id = %message.receiver_id,
            "step: handler_chain started"
        );

        for mw in &self.middleware {
            let mw_name = std::any::type_name_of_val(mw.as_ref());
            debug!(middleware = %mw_name, "step: middleware before");
            if !mw.before(inbound).await? {
                info!(middleware = %mw_name, "step: middleware before returned false, chain stopped");
                return Ok(HandlerResponse::Stop);
            }
        }

        for handler in &self.handlers {
            if !handler.before(inbound).await? {
                let handler_name = std::any::type_name_of_val(handler.as_ref());
                info!(handler = %handler_name, "step: handler before returned false, chain stopped");
                return Ok(HandlerResponse::Stop);
            }
        }

        let mut final_response = HandlerResponse::Continue;
        for handler in &self.handlers {
            let handler_name = std::any::type_name_of_val(handler.as_ref());
            let response = handler.handle(inbound).await?;
            debug!(handler = %handler_name, response = ?response, "step: handler done");

            match response {
                HandlerResponse::Stop | HandlerResponse::Delivered(_) => {
                    info!(handler = %handler_name, response = ?response, "step: handler chain stopped by handler");
                    final_response = response;
                    break;
                }
                HandlerResponse::Continue | HandlerResponse::Ignore => continue,
            }
        }

        for handler in self.handlers.iter().rev() {
            handler.after(inbound, &final_response).await?;
        }

        for mw in self.middleware.iter().rev() {
            let mw_name = std::any::type_name_of_val(mw.as_ref());
            debug!(middleware = %mw_name, "step: middleware after");
            mw.after(inbound, &final_response).await?;
        }

        info!(response = ?final_response, "step: handler_chain finished");
        Ok(final_response)
    }
}

/// [`MessageSink`] over a [`HandlerChain`]. Submissions are serialized.
pub struct ChainSink {
    chain: HandlerChain,
    gate: Mutex<()>,
}

impl ChainSink {
    pub fn new(chain: HandlerChain) -> Self {
        Self {
            chain,
            gate: Mutex::new(()),
        }
    }

    /// Holds off submissions until the returned guard is dropped.
    pub async fn pause(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }
}

#[async_trait]
impl MessageSink for ChainSink {
    async fn submit(&self, inbound: Inbound) -> Result<ChatMessage> {
        let _turn = self.gate.lock().await;
        match self.chain.handle(&inbound).await? {
            HandlerResponse::Stop => Err(HandlerError::State(format!(
                "message {} was rejected",
                inbound.message.id
            ))
            .into()),
            _ => Ok(inbound.message),
        }
    }
}
