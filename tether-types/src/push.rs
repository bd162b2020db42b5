//! Raw wire shapes a server push (or an update-bearing response) arrives in.
//!
//! The protocol has several container layouts for the same logical content:
//! a full combined container with entity side-tables, a bare single update,
//! and compressed "short" new-message shapes that omit everything the client
//! can reconstruct. [`ShortMessage::into_message`] and friends expand the
//! short shapes back into full [`Message`] objects so the rest of the
//! pipeline only ever deals with one message representation.

use crate::entity::{Chat, Message, User};
use crate::ids::{ChatId, MessageId, Peer, UserId};
use crate::update::Update;

// ─── Container ───────────────────────────────────────────────────────────────

/// A combined multi-update envelope: zero or more updates plus the users and
/// chats they reference.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Container {
    pub updates: Vec<Update>,
    pub users:   Vec<User>,
    pub chats:   Vec<Chat>,
    /// First sequence number covered by this container; `0` when the
    /// container is unsequenced.
    pub seq_start: i32,
    /// Last sequence number covered; `0` when unsequenced.
    pub seq: i32,
}

impl Container {
    /// An unsequenced container holding the given updates and no entities.
    pub fn unsequenced(updates: Vec<Update>) -> Self {
        Self { updates, users: vec![], chats: vec![], seq_start: 0, seq: 0 }
    }
}

// ─── Short message shapes ────────────────────────────────────────────────────

/// Compressed shape for a new message in a private chat.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShortMessage {
    pub id:      MessageId,
    /// The other party of the private chat.
    pub user_id: UserId,
    pub message: String,
    pub date:    i64,
    pub out:     bool,
    pub silent:  bool,
}

impl ShortMessage {
    /// Expand into a full [`Message`]. The peer and sender are both derived
    /// from `user_id`; an outgoing short message has no explicit sender.
    pub fn into_message(self) -> Message {
        Message {
            id:        self.id,
            peer:      Peer::User(self.user_id),
            from:      if self.out { None } else { Some(Peer::User(self.user_id)) },
            date:      self.date,
            out:       self.out,
            silent:    self.silent,
            text:      self.message,
            media:     None,
            edit_date: None,
        }
    }
}

/// Compressed shape for a new message in a basic group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShortChatMessage {
    pub id:      MessageId,
    pub chat_id: ChatId,
    pub from_id: UserId,
    pub message: String,
    pub date:    i64,
    pub out:     bool,
    pub silent:  bool,
}

impl ShortChatMessage {
    pub fn into_message(self) -> Message {
        Message {
            id:        self.id,
            peer:      Peer::Chat(self.chat_id),
            from:      Some(Peer::User(self.from_id)),
            date:      self.date,
            out:       self.out,
            silent:    self.silent,
            text:      self.message,
            media:     None,
            edit_date: None,
        }
    }
}

// ─── Push ────────────────────────────────────────────────────────────────────

/// An update-bearing payload, as received: either pushed by the server
/// outside any request/response pair, or embedded in a response.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Push {
    /// Combined multi-update envelope with entity side-tables.
    Container(Container),
    /// A single lightweight update with no entities attached.
    Single(Update),
    /// Compressed new private-chat message.
    ShortMessage(ShortMessage),
    /// Compressed new group message.
    ShortChatMessage(ShortChatMessage),
    /// The server could not enumerate missed updates; resynchronize.
    TooLong,
}

impl Push {
    /// Wire-style name of the container shape, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Container(c) if c.seq_start == 0 => "updates",
            Self::Container(_)                     => "updatesCombined",
            Self::Single(_)                  => "updateShort",
            Self::ShortMessage(_)            => "updateShortMessage",
            Self::ShortChatMessage(_)        => "updateShortChatMessage",
            Self::TooLong                    => "updatesTooLong",
        }
    }
}
