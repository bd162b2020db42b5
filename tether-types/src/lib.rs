//! # tether-types
//!
//! Protocol data model shared by the tether gateway and its collaborators.
//!
//! Everything here is plain owned data: entity snapshots as the server last
//! sent them, update payloads, the raw push containers they arrive in, and
//! the request/response sum types the gateway invokes with. No I/O, no wire
//! encoding — framing and serialization belong to the transport layer.

#![deny(unsafe_code)]

pub mod entity;
pub mod ids;
pub mod push;
pub mod request;
pub mod update;

pub use entity::{
    Chat, Document, Entity, FileReference, MediaId, Message, MessageLocator, MessageMedia, Photo,
    StickerSet, User,
};
pub use ids::{ChatId, DocumentId, EntityKey, MessageId, Peer, PhotoId, ShardId, StickerSetId, UserId};
pub use push::{Container, Push, ShortChatMessage, ShortMessage};
pub use request::{Request, Response};
pub use update::Update;

// ─── ConnectionState ─────────────────────────────────────────────────────────

/// Process-wide transport connection state.
///
/// Mutated only by connection-state signals from the transport; read by the
/// request invoker before every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// Transport is (re)establishing the connection.
    Connecting,
    /// Connected and authorized — requests may be issued.
    Connected,
    /// Connection is broken beyond the transport's own recovery (e.g. the
    /// session was revoked server-side).
    Broken,
}
