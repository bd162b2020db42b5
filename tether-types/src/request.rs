//! Outbound operations and their results.
//!
//! A [`Request`] is an immutable description of one outbound operation —
//! method identifier plus typed parameters. Requests are never mutated and
//! may be re-issued verbatim (the reference repair protocol does exactly
//! that). A [`Response`] is transient: the invoker consumes its embedded
//! entities and updates immediately and hands the rest to the caller.

use crate::entity::{Chat, Entity, Message, StickerSet, User};
use crate::ids::{ChatId, MessageId, Peer, StickerSetId, UserId};
use crate::push::Push;
use crate::update::Update;

// ─── Request ─────────────────────────────────────────────────────────────────

/// One outbound protocol operation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Request {
    /// Fetch full user objects by id.
    GetUsers { ids: Vec<UserId> },
    /// Fetch the logged-in user.
    GetSelf,
    /// Fetch full chat/channel objects by id.
    GetChats { ids: Vec<ChatId> },
    /// Fetch specific messages from a peer. Re-issued by reference repair.
    GetMessages { peer: Peer, ids: Vec<MessageId> },
    /// Send a text message.
    SendMessage {
        peer:     Peer,
        text:     String,
        silent:   bool,
        reply_to: Option<MessageId>,
    },
    /// Mark history as read up to `max_id`.
    ReadHistory { peer: Peer, max_id: MessageId },
    /// Fetch a sticker set descriptor.
    GetStickerSet { id: StickerSetId },
    /// Fetch the current update-sequence state.
    GetState,
    /// Fetch all updates missed since `seq`.
    GetDifference { seq: i32 },
    /// Invalidate the session server-side.
    LogOut,
}

impl Request {
    /// Wire method name, for logging and error envelopes.
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetUsers { .. }      => "users.getUsers",
            Self::GetSelf              => "users.getSelf",
            Self::GetChats { .. }      => "chats.getChats",
            Self::GetMessages { .. }   => "messages.getMessages",
            Self::SendMessage { .. }   => "messages.sendMessage",
            Self::ReadHistory { .. }   => "messages.readHistory",
            Self::GetStickerSet { .. } => "stickers.getStickerSet",
            Self::GetState             => "updates.getState",
            Self::GetDifference { .. } => "updates.getDifference",
            Self::LogOut               => "auth.logOut",
        }
    }

    /// `true` for message-producing writes; used to flag slow-mode waits.
    pub fn is_send(&self) -> bool {
        matches!(self, Self::SendMessage { .. })
    }
}

// ─── Response ────────────────────────────────────────────────────────────────

/// The transport's answer to a [`Request`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Response {
    Users(Vec<User>),
    Chats(Vec<Chat>),
    /// Messages plus the users/chats they reference.
    Messages {
        messages: Vec<Message>,
        users:    Vec<User>,
        chats:    Vec<Chat>,
    },
    StickerSet(StickerSet),
    /// Current update-sequence state.
    State { seq: i32 },
    /// Updates missed since the requested sequence.
    Difference {
        updates:  Vec<Update>,
        users:    Vec<User>,
        chats:    Vec<Chat>,
        /// Sequence state after applying this slice.
        seq:      i32,
        /// `false` if another `GetDifference` call is needed.
        is_final: bool,
    },
    /// A write acknowledged with an update container instead of a dedicated
    /// result object (the protocol answers most sends this way).
    Pushed(Push),
    Bool(bool),
}

impl Response {
    /// The update container embedded in this response, if any.
    pub fn embedded_push(&self) -> Option<&Push> {
        match self {
            Self::Pushed(push) => Some(push),
            _                  => None,
        }
    }

    /// Every entity this response carries, as cacheable snapshots.
    ///
    /// The order puts users and chats before messages so that by the time a
    /// message is merged its referenced peers are already resolvable.
    pub fn embedded_entities(&self) -> Vec<Entity> {
        match self {
            Self::Users(users) => users.iter().cloned().map(Entity::User).collect(),
            Self::Chats(chats) => chats.iter().cloned().map(Entity::Chat).collect(),
            Self::Messages { messages, users, chats } => {
                let mut out: Vec<Entity> = Vec::with_capacity(users.len() + chats.len() + messages.len());
                out.extend(users.iter().cloned().map(Entity::User));
                out.extend(chats.iter().cloned().map(Entity::Chat));
                out.extend(messages.iter().cloned().map(Entity::Message));
                out
            }
            Self::Difference { users, chats, .. } => {
                let mut out: Vec<Entity> = Vec::with_capacity(users.len() + chats.len());
                out.extend(users.iter().cloned().map(Entity::User));
                out.extend(chats.iter().cloned().map(Entity::Chat));
                out
            }
            Self::StickerSet(set) => vec![Entity::StickerSet(set.clone())],
            Self::State { .. } | Self::Pushed(_) | Self::Bool(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityKey;

    #[test]
    fn method_names() {
        assert_eq!(Request::GetState.method(), "updates.getState");
        assert_eq!(
            Request::GetMessages { peer: Peer::User(UserId(1)), ids: vec![] }.method(),
            "messages.getMessages"
        );
    }

    #[test]
    fn only_send_message_is_a_send() {
        let send = Request::SendMessage {
            peer: Peer::User(UserId(1)), text: "x".into(), silent: false, reply_to: None,
        };
        assert!(send.is_send());
        assert!(!Request::LogOut.is_send());
    }

    #[test]
    fn messages_response_orders_entities_before_messages() {
        let user = User {
            id: UserId(5), min: false, first_name: None, last_name: None,
            username: None, is_bot: false, is_premium: false, photo: None,
        };
        let message = Message {
            id: MessageId(1), peer: Peer::User(UserId(5)), from: Some(Peer::User(UserId(5))),
            date: 0, out: false, silent: false, text: "hi".into(), media: None, edit_date: None,
        };
        let resp = Response::Messages {
            messages: vec![message],
            users:    vec![user],
            chats:    vec![],
        };
        let keys: Vec<EntityKey> = resp.embedded_entities().iter().map(Entity::key).collect();
        assert_eq!(keys[0], EntityKey::User(UserId(5)));
        assert!(matches!(keys[1], EntityKey::Message(..)));
    }
}
