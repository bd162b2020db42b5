//! The transport collaborator seam.
//!
//! The gateway depends only on this shape — an asynchronous `invoke` plus an
//! event channel for pushes and connection-state transitions — never on a
//! concrete transport implementation. Multiple concurrent `invoke` calls are
//! allowed; the transport does not support cancelling one in flight.

use async_trait::async_trait;

use tether_types::{ConnectionState, Push, Request, Response, ShardId};

use crate::errors::InvocationError;

// ─── Transport ───────────────────────────────────────────────────────────────

/// Low-level protocol client: connection, framing, encryption.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request and await its response.
    ///
    /// `shard` selects a backend shard/data-center; `None` targets the
    /// current one. Failures are `Server`, `Io` or `Dropped` — the
    /// `Disconnected` variant is produced by the gateway's own gating and
    /// never by a transport.
    async fn invoke(
        &self,
        request: &Request,
        shard:   Option<ShardId>,
    ) -> Result<Response, InvocationError>;
}

// ─── TransportEvent ──────────────────────────────────────────────────────────

/// Unsolicited transport-originated event, delivered on the event channel
/// handed to [`Gateway::new`](crate::Gateway::new).
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A server push arriving outside any request/response pair.
    Push(Push),
    /// The transport's connection state changed.
    Connection(ConnectionState),
}
