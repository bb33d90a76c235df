use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use keyed_lock::LockManager;
use konsul_core::{ChatMessage, ChatRole, Inbound, MessageSink, Result};
use storage::{AppointmentRepository, PendingGreeting};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::queue::DueQueue;
use crate::schedule::consultation_instant;

pub const DEFAULT_GREETING: &str = "Halo, ada yang bisa dibantu?";

const LOCK_OWNER: &str = "auto-message";

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub greeting: String,
    /// Offset the stored date and time are expressed in.
    pub offset: FixedOffset,
    /// Full re-read of pending appointments, in case a notification was missed.
    pub refresh_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            offset: FixedOffset::east_opt(7 * 3600).unwrap_or_else(|| Utc.fix()),
            refresh_interval: Duration::from_secs(30 * 60),
        }
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub examined: usize,
    pub sent: usize,
    pub not_due: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    NotDue,
    Skipped,
    Failed,
}

impl TickReport {
    fn record(&mut self, outcome: Outcome) {
        self.examined += 1;
        match outcome {
            Outcome::Sent => self.sent += 1,
            Outcome::NotDue => self.not_due += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

/// Sender half handed to whoever accepts appointments.
#[derive(Clone)]
pub struct AcceptedNotifier {
    tx: mpsc::Sender<String>,
}

impl AcceptedNotifier {
    /// Tells the scheduler `appointment_id` was just accepted. Never blocks; when the channel is
    /// full the next periodic refresh picks the appointment up.
    pub fn notify(&self, appointment_id: &str) {
        if let Err(e) = self.tx.try_send(appointment_id.to_string()) {
            warn!(appointment_id = %appointment_id, error = %e, "Could not notify scheduler");
        }
    }
}

pub fn accepted_channel(capacity: usize) -> (AcceptedNotifier, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(capacity);
    (AcceptedNotifier { tx }, rx)
}

pub struct AutoMessageScheduler {
    appointments: AppointmentRepository,
    sink: Arc<dyn MessageSink>,
    locks: Arc<LockManager>,
    config: SchedulerConfig,
}

impl AutoMessageScheduler {
    pub fn new(
        appointments: AppointmentRepository,
        sink: Arc<dyn MessageSink>,
        locks: Arc<LockManager>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            appointments,
            sink,
            locks,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// One sweep: greets every accepted, not yet greeted appointment whose start is at or before
    /// `now`. Failures of one appointment do not affect the others.
    #[instrument(skip(self))]
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let pending = self.appointments.pending_greetings().await?;
        info!(count = pending.len(), "step: auto-message tick, pending appointments loaded");

        let mut report = TickReport::default();
        for appointment in &pending {
            report.record(self.process(appointment, now).await);
        }

        info!(
            examined = report.examined,
            sent = report.sent,
            not_due = report.not_due,
            skipped = report.skipped,
            failed = report.failed,
            "step: auto-message tick finished"
        );
        Ok(report)
    }

    fn due_instant(&self, appointment: &PendingGreeting) -> Option<DateTime<Utc>> {
        if appointment.doctor_ref.is_none() || appointment.citizen_ref.is_none() {
            warn!(
                appointment_id = %appointment.id,
                doctor_found = appointment.doctor_ref.is_some(),
                citizen_found = appointment.citizen_ref.is_some(),
                "Incomplete appointment, skipped"
            );
            return None;
        }
        match consultation_instant(
            appointment.consult_date,
            &appointment.consult_time,
            self.config.offset,
        ) {
            Ok(instant) => Some(instant),
            Err(e) => {
                warn!(appointment_id = %appointment.id, error = %e, "Unusable consultation time, skipped");
                None
            }
        }
    }

    async fn process(&self, appointment: &PendingGreeting, now: DateTime<Utc>) -> Outcome {
        let Some(due) = self.due_instant(appointment) else {
            return Outcome::Skipped;
        };
        if due > now {
            debug!(appointment_id = %appointment.id, due = %due, "Not due yet");
            return Outcome::NotDue;
        }

        let key = format!("auto_msg_{}", appointment.id);
        let _guard = self.locks.acquire(&key, LOCK_OWNER).await;

        match self.appointments.is_auto_message_sent(&appointment.id).await {
            Ok(false) => {}
            Ok(true) => {
                debug!(appointment_id = %appointment.id, "Greeting already sent");
                return Outcome::Skipped;
            }
            Err(e) => {
                error!(appointment_id = %appointment.id, error = %e, "Failed to re-check greeting flag");
                return Outcome::Failed;
            }
        }

        let greeting = ChatMessage::text(
            appointment.doctor_id.as_str(),
            appointment.citizen_id.as_str(),
            ChatRole::Doctor,
            self.config.greeting.as_str(),
            now,
        )
        .with_appointment(appointment.id.as_str());

        if let Err(e) = self.sink.submit(Inbound::system(greeting)).await {
            error!(appointment_id = %appointment.id, error = %e, "Failed to send greeting");
            return Outcome::Failed;
        }

        match self.appointments.mark_auto_message_sent(&appointment.id).await {
            Ok(_) => {
                info!(appointment_id = %appointment.id, "Greeting sent");
                Outcome::Sent
            }
            Err(e) => {
                error!(
                    appointment_id = %appointment.id,
                    error = %e,
                    "Greeting sent but flag not set; it may be sent again"
                );
                Outcome::Failed
            }
        }
    }

    async fn refresh(&self, queue: &mut DueQueue) {
        let pending = match self.appointments.pending_greetings().await {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "Failed to load pending appointments");
                return;
            }
        };
        for appointment in &pending {
            if let Some(due) = self.due_instant(appointment) {
                queue.push(due, appointment.id.clone());
            }
        }
        debug!(queued = queue.len(), "Refreshed auto-message queue");
    }

    async fn enqueue(&self, queue: &mut DueQueue, appointment_id: &str) {
        match self.appointments.pending_greeting(appointment_id).await {
            Ok(Some(appointment)) => {
                if let Some(due) = self.due_instant(&appointment) {
                    queue.push(due, appointment.id);
                }
            }
            Ok(None) => debug!(appointment_id = %appointment_id, "Nothing to schedule"),
            Err(e) => error!(appointment_id = %appointment_id, error = %e, "Failed to load appointment"),
        }
    }

    async fn fire_due(&self, queue: &mut DueQueue) {
        let now = Utc::now();
        for appointment_id in queue.pop_due(now) {
            match self.appointments.pending_greeting(&appointment_id).await {
                Ok(Some(appointment)) => {
                    self.process(&appointment, now).await;
                }
                Ok(None) => debug!(appointment_id = %appointment_id, "No longer pending"),
                Err(e) => error!(appointment_id = %appointment_id, error = %e, "Failed to load appointment"),
            }
        }
    }

    /// Runs until `accepted` is closed: sleeps until the earliest queued start, greets what is
    /// due, enqueues accepted appointments as they are announced and re-reads everything every
    /// `refresh_interval`.
    pub async fn run(self: Arc<Self>, mut accepted: mpsc::Receiver<String>) {
        info!(
            refresh_secs = self.config.refresh_interval.as_secs(),
            "Auto-message scheduler started"
        );
        let mut queue = DueQueue::new();
        let mut refresh = tokio::time::interval(self.config.refresh_interval);
        refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let wait = queue
                .next_due()
                .map(|due| (due - Utc::now()).to_std().unwrap_or(Duration::ZERO))
                .unwrap_or(self.config.refresh_interval);

            tokio::select! {
                _ = refresh.tick() => self.refresh(&mut queue).await,
                _ = tokio::time::sleep(wait) => self.fire_due(&mut queue).await,
                notified = accepted.recv() => match notified {
                    Some(appointment_id) => self.enqueue(&mut queue, &appointment_id).await,
                    None => break,
                },
            }
        }
        info!("Auto-message scheduler stopped");
    }
}
