//! # Chat list
//!
//! Per-pair conversation summaries (the inbox view): last message, last activity, per-participant
//! unread counters and the other participant's display data.
//!
//! - [`ChatListAggregator`] – record, list, mark read, close.
//! - [`ChatListHandler`] – chain handler that records every persisted message.

mod aggregator;
mod handler;
mod summary;

pub use aggregator::ChatListAggregator;
pub use handler::ChatListHandler;
pub use summary::{ConversationSummary, ParticipantSummary};
