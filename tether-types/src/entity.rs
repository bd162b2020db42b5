//! Entity snapshots: the last-known full server objects the gateway caches.
//!
//! A snapshot is whatever the server most recently sent for a given key.
//! Users and chats may arrive as *min* stubs — partial projections
//! piggy-backed on updates that carry just enough to render a name — and the
//! cache must never let a stub overwrite a previously seen full object.

use std::fmt;

use crate::ids::{ChatId, DocumentId, EntityKey, MessageId, Peer, PhotoId, StickerSetId, UserId};

// ─── FileReference ───────────────────────────────────────────────────────────

/// Opaque handle embedded in a media descriptor, required to fetch the
/// underlying bytes. Expires server-side and must occasionally be refreshed
/// by re-fetching the owning entity.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileReference(pub Vec<u8>);

impl fmt::Debug for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileReference({} bytes)", self.0.len())
    }
}

// ─── MessageLocator ──────────────────────────────────────────────────────────

/// Points at the message a media descriptor was extracted from, so the
/// repair protocol can re-fetch that one message when the descriptor's file
/// reference goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageLocator {
    pub peer: Peer,
    pub id:   MessageId,
}

// ─── User / Chat ─────────────────────────────────────────────────────────────

/// A user account as last seen from the server.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    pub id:         UserId,
    /// `true` for a partial projection sent inline with updates.
    pub min:        bool,
    pub first_name: Option<String>,
    pub last_name:  Option<String>,
    pub username:   Option<String>,
    pub is_bot:     bool,
    pub is_premium: bool,
    /// Profile photo, if the server sent one with this snapshot.
    pub photo:      Option<Photo>,
}

impl User {
    /// Display name: first + last, falling back to the username.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last  = self.last_name.as_deref().unwrap_or("");
        let name  = format!("{first} {last}").trim().to_string();
        if !name.is_empty() {
            return name;
        }
        self.username.clone().unwrap_or_else(|| format!("user{}", self.id))
    }
}

/// A basic group or channel/supergroup as last seen from the server.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chat {
    pub id:           ChatId,
    /// `true` for a partial projection sent inline with updates.
    pub min:          bool,
    pub title:        String,
    pub is_channel:   bool,
    /// The logged-in account was banned or the chat is otherwise inaccessible.
    pub is_forbidden: bool,
    pub member_count: Option<i32>,
}

// ─── Media descriptors ───────────────────────────────────────────────────────

/// A document: file, sticker, audio, video — anything that is not a photo.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    pub id:             DocumentId,
    pub file_reference: FileReference,
    pub mime_type:      String,
    pub size:           i64,
    pub file_name:      Option<String>,
    /// The message this descriptor was extracted from, when known. Filled in
    /// by the cache as messages are merged; required for reference repair.
    pub owner:          Option<MessageLocator>,
}

/// A photo.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Photo {
    pub id:             PhotoId,
    pub file_reference: FileReference,
    pub width:          i32,
    pub height:         i32,
    /// See [`Document::owner`].
    pub owner:          Option<MessageLocator>,
}

/// Addresses one cached media descriptor for fetch/repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MediaId {
    Document(DocumentId),
    Photo(PhotoId),
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document(id) => write!(f, "document{id}"),
            Self::Photo(id)    => write!(f, "photo{id}"),
        }
    }
}

// ─── StickerSet ──────────────────────────────────────────────────────────────

/// An installed sticker set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StickerSet {
    pub id:         StickerSetId,
    pub title:      String,
    pub short_name: String,
    pub count:      i32,
}

// ─── Message ─────────────────────────────────────────────────────────────────

/// Media attached to a message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageMedia {
    Document(Document),
    Photo(Photo),
    /// Link preview; may carry its own media.
    WebPage {
        url:      String,
        document: Option<Document>,
        photo:    Option<Photo>,
    },
}

/// A message as last seen from the server.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub id:        MessageId,
    pub peer:      Peer,
    /// Sender; not set for anonymous channel posts.
    pub from:      Option<Peer>,
    /// Unix timestamp.
    pub date:      i64,
    /// Sent by the logged-in account.
    pub out:       bool,
    pub silent:    bool,
    pub text:      String,
    pub media:     Option<MessageMedia>,
    pub edit_date: Option<i64>,
}

impl Message {
    pub fn locator(&self) -> MessageLocator {
        MessageLocator { peer: self.peer, id: self.id }
    }
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// Closed sum over every cacheable entity kind.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Entity {
    User(User),
    Chat(Chat),
    Message(Message),
    Document(Document),
    Photo(Photo),
    StickerSet(StickerSet),
}

impl Entity {
    /// Cache key of this entity.
    pub fn key(&self) -> EntityKey {
        match self {
            Self::User(u)       => EntityKey::User(u.id),
            Self::Chat(c)       => EntityKey::Chat(c.id),
            Self::Message(m)    => EntityKey::Message(m.peer, m.id),
            Self::Document(d)   => EntityKey::Document(d.id),
            Self::Photo(p)      => EntityKey::Photo(p.id),
            Self::StickerSet(s) => EntityKey::StickerSet(s.id),
        }
    }

    /// Kind name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_)       => "user",
            Self::Chat(_)       => "chat",
            Self::Message(_)    => "message",
            Self::Document(_)   => "document",
            Self::Photo(_)      => "photo",
            Self::StickerSet(_) => "stickerSet",
        }
    }

    /// `true` if this snapshot is a min stub (users and chats only).
    pub fn is_min(&self) -> bool {
        match self {
            Self::User(u) => u.min,
            Self::Chat(c) => c.min,
            _             => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> User {
        User {
            id:         UserId(id),
            min:        false,
            first_name: Some("Ada".into()),
            last_name:  Some("Lovelace".into()),
            username:   Some("ada".into()),
            is_bot:     false,
            is_premium: false,
            photo:      None,
        }
    }

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(user(1).display_name(), "Ada Lovelace");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut u = user(1);
        u.first_name = None;
        u.last_name  = None;
        assert_eq!(u.display_name(), "ada");
    }

    #[test]
    fn entity_keys_match_ids() {
        let e = Entity::User(user(9));
        assert_eq!(e.key(), EntityKey::User(UserId(9)));
        assert!(!e.is_min());
    }
}
