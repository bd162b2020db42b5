//! Identifier newtypes and peer addressing.

use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident($repr:ty)) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub $repr);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(raw: $repr) -> Self { Self(raw) }
        }
    };
}

id_type!(
    /// A user account.
    UserId(i64)
);
id_type!(
    /// A basic group or a channel/supergroup (the peer kind disambiguates).
    ChatId(i64)
);
id_type!(
    /// A message, unique within its peer.
    MessageId(i32)
);
id_type!(
    /// A document (file, sticker, video, …).
    DocumentId(i64)
);
id_type!(
    /// A photo.
    PhotoId(i64)
);
id_type!(
    /// An installed sticker set.
    StickerSetId(i64)
);
id_type!(
    /// Backend shard / data-center selector, passed opaquely to the transport.
    ShardId(i32)
);

// ─── Peer ─────────────────────────────────────────────────────────────────────

/// Where a message lives or an update applies: a private chat with a user, a
/// basic group, or a channel/supergroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Peer {
    User(UserId),
    Chat(ChatId),
    Channel(ChatId),
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id)    => write!(f, "user{id}"),
            Self::Chat(id)    => write!(f, "chat{id}"),
            Self::Channel(id) => write!(f, "channel{id}"),
        }
    }
}

// ─── EntityKey ────────────────────────────────────────────────────────────────

/// Cache key of an entity: kind plus identifier.
///
/// Message ids are only unique per peer, so the message key carries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKey {
    User(UserId),
    Chat(ChatId),
    Message(Peer, MessageId),
    Document(DocumentId),
    Photo(PhotoId),
    StickerSet(StickerSetId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_display() {
        assert_eq!(Peer::User(UserId(7)).to_string(), "user7");
        assert_eq!(Peer::Channel(ChatId(42)).to_string(), "channel42");
    }

    #[test]
    fn message_keys_are_per_peer() {
        let a = EntityKey::Message(Peer::Chat(ChatId(1)), MessageId(5));
        let b = EntityKey::Message(Peer::Chat(ChatId(2)), MessageId(5));
        assert_ne!(a, b);
    }
}
