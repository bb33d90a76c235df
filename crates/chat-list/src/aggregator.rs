use chrono::{DateTime, Utc};
use konsul_core::{ChatMessage, ChatRole, KonsulError, Result};
use storage::{
    ChatListRecord, ChatListRepository, ChatListStatus, ChatRepository, DirectoryRepository,
    ProfileKind, StorageError, Store,
};
use tracing::{debug, info, instrument, warn};

use crate::summary::{ConversationSummary, ParticipantSummary};

/// Keeps one summary per participant pair in step with the message log.
///
/// Callers serialize `record_message` for a given pair (the hub runs one submission at a time);
/// the appointment id is additionally unique at the table level.
#[derive(Clone)]
pub struct ChatListAggregator {
    chat_lists: ChatListRepository,
    directory: DirectoryRepository,
    messages: ChatRepository,
}

impl ChatListAggregator {
    pub fn new(store: &Store) -> Self {
        Self {
            chat_lists: store.chat_lists.clone(),
            directory: store.directory.clone(),
            messages: store.messages.clone(),
        }
    }

    /// Creates the conversation (sender 0 unread, receiver 1) or overwrites its last message and
    /// bumps the receiver's counter.
    ///
    /// An appointment id already linked to a different pair is ignored for this message.
    #[instrument(skip(self, text))]
    pub async fn record_message(
        &self,
        sender: &str,
        sender_role: ChatRole,
        receiver: &str,
        text: &str,
        date: DateTime<Utc>,
        appointment_id: Option<&str>,
    ) -> Result<ChatListRecord> {
        let appointment_id = self
            .claimable_appointment(sender, receiver, appointment_id)
            .await?;

        if let Some(existing) = self.chat_lists.find_by_pair(sender, receiver).await? {
            return self
                .touch(&existing, text, date, receiver, appointment_id)
                .await;
        }

        let receiver_role = self.receiver_role(receiver, sender_role).await?;
        let record = ChatListRecord::new(
            (sender.to_string(), sender_role.participant_label().to_string()),
            (receiver.to_string(), receiver_role.participant_label().to_string()),
            text.to_string(),
            date,
            appointment_id.map(str::to_string),
        );

        match self
            .chat_lists
            .create(&record, &[(sender, 0), (receiver, 1)])
            .await
        {
            Ok(()) => {
                info!(chat_list_id = %record.id, sender = %sender, receiver = %receiver, "Created conversation");
                Ok(record)
            }
            Err(StorageError::AlreadyExists(_)) => {
                warn!(appointment_id = ?appointment_id, "Conversation created concurrently, updating instead");
                let existing = self
                    .chat_lists
                    .find_by_pair(sender, receiver)
                    .await?
                    .ok_or_else(|| {
                        KonsulError::Conflict(format!(
                            "appointment {:?} is linked to another conversation",
                            appointment_id
                        ))
                    })?;
                self.touch(&existing, text, date, receiver, appointment_id)
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drops `appointment_id` when another pair's conversation already owns it.
    async fn claimable_appointment<'a>(
        &self,
        sender: &str,
        receiver: &str,
        appointment_id: Option<&'a str>,
    ) -> Result<Option<&'a str>> {
        let Some(id) = appointment_id else {
            return Ok(None);
        };
        match self.chat_lists.find_by_appointment(id).await? {
            Some(owner) if !(owner.has_participant(sender) && owner.has_participant(receiver)) => {
                warn!(
                    appointment_id = %id,
                    sender = %sender,
                    receiver = %receiver,
                    "Appointment belongs to another conversation, ignoring it"
                );
                Ok(None)
            }
            _ => Ok(Some(id)),
        }
    }

    /// Role from the directory; unknown users are assumed to be on the other side of the sender.
    async fn receiver_role(&self, receiver: &str, sender_role: ChatRole) -> Result<ChatRole> {
        Ok(match self.directory.resolve(receiver).await? {
            Some((ProfileKind::Doctor, _)) => ChatRole::Doctor,
            Some((ProfileKind::Citizen, _)) => ChatRole::Citizen,
            None => sender_role.counterpart(),
        })
    }

    async fn touch(
        &self,
        existing: &ChatListRecord,
        text: &str,
        date: DateTime<Utc>,
        receiver: &str,
        appointment_id: Option<&str>,
    ) -> Result<ChatListRecord> {
        let reassign = appointment_id.filter(|id| existing.appointment_id.as_deref() != Some(*id));
        self.chat_lists
            .record_activity(&existing.id, text, date, receiver, reassign)
            .await?;
        debug!(
            chat_list_id = %existing.id,
            receiver = %receiver,
            reassigned = ?reassign,
            "Updated conversation"
        );
        self.chat_lists
            .find_by_id(&existing.id)
            .await?
            .ok_or_else(|| KonsulError::NotFound(format!("chat list {}", existing.id)))
    }

    /// Every conversation `user_id` is in, most recent activity first.
    #[instrument(skip(self))]
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        let records = self.chat_lists.list_for_user(user_id).await?;
        let mut summaries = Vec::with_capacity(records.len());

        for record in records {
            let Some((other_id, other_role)) = record.other_participant(user_id) else {
                continue;
            };
            let participant = self.participant(other_id, other_role).await?;
            let unread_count = self.chat_lists.unread_for(&record.id, user_id).await?;
            summaries.push(ConversationSummary {
                id: record.id.clone(),
                last_message: record.last_message.clone(),
                last_message_date: record.last_message_date,
                unread_count,
                participant,
                status: record.status.clone(),
                appointment_id: record.appointment_id.clone(),
            });
        }

        Ok(summaries)
    }

    async fn participant(&self, id: &str, role: &str) -> Result<ParticipantSummary> {
        let (name, avatar_url) = match self.directory.resolve(id).await? {
            Some((_, profile)) => (profile.name, profile.avatar_url),
            None => (role.to_string(), None),
        };
        Ok(ParticipantSummary {
            id: id.to_string(),
            role: role.to_string(),
            name,
            avatar_url,
        })
    }

    /// Resets `user_id`'s unread counter. Only participants may do so.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, chat_list_id: &str, user_id: &str) -> Result<()> {
        let record = self
            .chat_lists
            .find_by_id(chat_list_id)
            .await?
            .ok_or_else(|| KonsulError::NotFound(format!("chat list {}", chat_list_id)))?;
        if !record.has_participant(user_id) {
            return Err(KonsulError::Forbidden(format!(
                "{} is not part of chat list {}",
                user_id, chat_list_id
            )));
        }
        self.chat_lists.reset_unread(chat_list_id, user_id).await?;
        Ok(())
    }

    /// Marks the appointment's conversation done. Returns false when it has none.
    pub async fn close_for_appointment(&self, appointment_id: &str) -> Result<bool> {
        let changed = self
            .chat_lists
            .set_status_for_appointment(appointment_id, ChatListStatus::Done)
            .await?;
        if changed > 0 {
            info!(appointment_id = %appointment_id, "Closed conversation");
        }
        Ok(changed > 0)
    }

    /// Full message history between two users, oldest first.
    pub async fn history_between(&self, a: &str, b: &str) -> Result<Vec<ChatMessage>> {
        self.messages
            .between(a, b)
            .await?
            .into_iter()
            .map(ChatMessage::try_from)
            .collect()
    }
}
