//! # konsul-core
//!
//! Core types and traits for the consultation chat backend: [`ChatMessage`], [`Inbound`],
//! [`Handler`], [`Middleware`], the wire events, the [`Delivery`] / [`MessageSink`] seams and
//! tracing initialization. Transport-agnostic; used by every other crate in the workspace.

pub mod delivery;
pub mod error;
pub mod event;
pub mod logger;
pub mod types;

pub use delivery::{Delivery, MessageSink};
pub use error::{HandlerError, KonsulError, Result};
pub use event::{ClientEvent, ServerEvent};
pub use logger::{init_tracing, LogFormat};
pub use types::{
    AuthUser, ChatMessage, ChatRole, DeliveryMode, Handler, HandlerResponse, Inbound,
    IncomingChatMessage, MessageType, Middleware, Origin, Role,
};
