//! Row models for every table, plus conversions to the core domain types.

mod appointment;
mod article;
mod chat_list;
mod chat_message;
mod profile;

pub use appointment::{AppointmentRecord, AppointmentStatus, PendingGreeting};
pub use article::ArticleRecord;
pub use chat_list::{ChatListRecord, ChatListStatus};
pub use chat_message::ChatMessageRecord;
pub use profile::{ProfileKind, ProfileRecord};
