//! # Auto-message
//!
//! Sends the doctor's opening greeting once an accepted consultation reaches its start time, then
//! marks the appointment so the greeting is never sent twice.
//!
//! - [`AutoMessageScheduler::tick`] – one sweep over every pending appointment.
//! - [`AutoMessageScheduler::run`] – event-driven loop: due-time queue, accept notifications,
//!   periodic full refresh.

mod queue;
mod schedule;
mod scheduler;

pub use queue::DueQueue;
pub use schedule::{consultation_instant, parse_utc_offset, ScheduleError};
pub use scheduler::{
    accepted_channel, AcceptedNotifier, AutoMessageScheduler, SchedulerConfig, TickReport,
    DEFAULT_GREETING,
};
