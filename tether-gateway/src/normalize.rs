//! Update normalization: many wire shapes in, two logical forms out.
//!
//! The protocol delivers the same logical content in several container
//! layouts (full combined envelopes, bare single updates, compressed short
//! messages). [`normalize`] is a pure function of payload shape that reduces
//! them all to a [`NormalizedUpdate`] — either a multi-update envelope with
//! its referenced entities attached, or a single lightweight update.
//! Connection-state transitions enter the same stream as
//! [`NormalizedUpdate::ConnectionSignal`], produced by the gateway's event
//! pump rather than by this function.

use std::sync::Arc;

use tether_types::{ConnectionState, Entity, Push, Update};

// ─── NormalizedUpdate ────────────────────────────────────────────────────────

/// One unit of the ordered stream delivered to the update applier.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedUpdate {
    /// A single lightweight update, no entities attached.
    Single(Update),
    /// Zero or more updates drawn from one container, sharing the entity
    /// list that container carried. The list is attached by reference —
    /// every update from the container sees the same `Arc`, not a copy.
    Many {
        updates:  Vec<Update>,
        entities: Arc<Vec<Entity>>,
    },
    /// The transport's connection state changed.
    ConnectionSignal(ConnectionState),
}

impl NormalizedUpdate {
    /// Urgent updates replace the dispatch queue's scheduled flush with an
    /// immediate one: connection signals, and any update kind marked urgent.
    pub fn is_urgent(&self) -> bool {
        match self {
            Self::ConnectionSignal(_)    => true,
            Self::Single(update)         => update.is_urgent(),
            Self::Many { updates, .. }   => updates.iter().any(Update::is_urgent),
        }
    }

    /// Number of update payloads carried.
    pub fn update_count(&self) -> usize {
        match self {
            Self::Single(_)              => 1,
            Self::Many { updates, .. }   => updates.len(),
            Self::ConnectionSignal(_)    => 1,
        }
    }
}

// ─── normalize ───────────────────────────────────────────────────────────────

/// Classify a raw push payload by structural shape.
///
/// Deterministic and stateless. Container-relative update order is
/// preserved. A container with zero updates still yields a `Many` with its
/// entities so the caller can perform the cache writes; it is the caller's
/// job not to enqueue an empty envelope.
pub fn normalize(push: Push) -> NormalizedUpdate {
    match push {
        Push::Container(container) => {
            let mut entities: Vec<Entity> =
                Vec::with_capacity(container.users.len() + container.chats.len());
            entities.extend(container.users.into_iter().map(Entity::User));
            entities.extend(container.chats.into_iter().map(Entity::Chat));
            NormalizedUpdate::Many {
                updates:  container.updates,
                entities: Arc::new(entities),
            }
        }
        Push::Single(update) => NormalizedUpdate::Single(update),
        // Short shapes expand to a full message; the sender is known only by
        // id, so there is no entity list to attach.
        Push::ShortMessage(short) => NormalizedUpdate::Many {
            updates:  vec![Update::NewMessage(short.into_message())],
            entities: Arc::new(vec![]),
        },
        Push::ShortChatMessage(short) => NormalizedUpdate::Many {
            updates:  vec![Update::NewMessage(short.into_message())],
            entities: Arc::new(vec![]),
        },
        Push::TooLong => NormalizedUpdate::Single(Update::TooLong),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
