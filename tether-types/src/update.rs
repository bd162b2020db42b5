//! Server-originated state-change notifications.

use crate::entity::Message;
use crate::ids::{ChatId, MessageId, Peer, UserId};

// ─── Update ──────────────────────────────────────────────────────────────────

/// One state change pushed by the server.
///
/// The gateway does not interpret these beyond classification and ordering;
/// their business meaning belongs to the update applier downstream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Update {
    /// A new incoming or outgoing message.
    NewMessage(Message),
    /// An existing message was edited.
    MessageEdited(Message),
    /// One or more messages were deleted. `channel` is set when the deletion
    /// happened in a channel/supergroup (ids are only unique per channel).
    MessagesDeleted {
        channel: Option<ChatId>,
        ids:     Vec<MessageId>,
    },
    /// The other side read our messages up to `max_id`.
    ReadHistoryOutbox { peer: Peer, max_id: MessageId },
    /// We read incoming messages up to `max_id` (e.g. from another device).
    ReadHistoryInbox {
        peer:         Peer,
        max_id:       MessageId,
        unread_count: i32,
    },
    /// A user went online or offline.
    UserStatus { user_id: UserId, online: bool },
    /// A user is typing in a chat.
    UserTyping { peer: Peer, user_id: UserId },
    /// Group member count changed.
    ChatParticipants { chat_id: ChatId, count: i32 },
    /// Notification settings for a peer changed.
    NotifySettings {
        peer:        Peer,
        muted_until: Option<i64>,
    },
    /// A service broadcast from the operator.
    ServiceNotification { message: String },
    /// Too many updates were missed to enumerate — the application must
    /// resynchronize its state.
    TooLong,
}

impl Update {
    /// Urgent kinds must reach the applier promptly: they shorten the
    /// dispatch queue's coalescing window instead of waiting out a batch.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::TooLong)
    }

    /// Wire-style name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewMessage(_)             => "updateNewMessage",
            Self::MessageEdited(_)          => "updateEditMessage",
            Self::MessagesDeleted { .. }    => "updateDeleteMessages",
            Self::ReadHistoryOutbox { .. }  => "updateReadHistoryOutbox",
            Self::ReadHistoryInbox { .. }   => "updateReadHistoryInbox",
            Self::UserStatus { .. }         => "updateUserStatus",
            Self::UserTyping { .. }         => "updateUserTyping",
            Self::ChatParticipants { .. }   => "updateChatParticipants",
            Self::NotifySettings { .. }     => "updateNotifySettings",
            Self::ServiceNotification { .. } => "updateServiceNotification",
            Self::TooLong                   => "updatesTooLong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_too_long_is_urgent() {
        assert!(Update::TooLong.is_urgent());
        assert!(!Update::UserStatus { user_id: UserId(1), online: true }.is_urgent());
        assert!(
            !Update::MessagesDeleted { channel: None, ids: vec![MessageId(1)] }.is_urgent()
        );
    }
}
