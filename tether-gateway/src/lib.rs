//! # tether-gateway
//!
//! Gateway layer between a chat application's state store and a binary
//! messaging protocol transport.
//!
//! ## What it does
//! - Connection-gated request invocation with error classification and a
//!   report-don't-propagate default policy
//! - Update extraction from responses and pushes, normalized to two logical
//!   forms and delivered to the applier as ordered, coalesced batches
//! - A process-wide entity reference cache (users, chats, messages, media
//!   descriptors, sticker sets) with a min-stub downgrade guard
//! - One-shot stale-reference repair for media fetches
//! - Update-sequence gap detection with urgent resynchronize signaling
//!
//! The transport itself (sockets, framing, encryption, reconnects) and the
//! update applier (the state store) are collaborators behind the
//! [`Transport`] and [`UpdateApplier`] traits; tests substitute both.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tether_gateway::{Config, Gateway, InvokeParams};
//! use tether_types::Request;
//!
//! # async fn run(
//! #     transport: Arc<dyn tether_gateway::Transport>,
//! #     events: tokio::sync::mpsc::UnboundedReceiver<tether_gateway::TransportEvent>,
//! #     applier: Arc<dyn tether_gateway::UpdateApplier>,
//! #     sink: Arc<dyn tether_gateway::ErrorSink>,
//! # ) {
//! let gateway = Gateway::new(transport, events, applier, sink, Config::default());
//! let state = gateway.invoke(&Request::GetState, InvokeParams::default()).await;
//! # }
//! ```

#![deny(unsafe_code)]

pub mod cache;
mod errors;
mod invoke;
pub mod media;
pub mod normalize;
pub mod queue;
pub mod seq;
mod sink;
mod transport;

pub use errors::{ErrorEnvelope, ErrorKind, InvocationError, ServerError};
pub use invoke::InvokeParams;
pub use media::ProgressHandle;
pub use normalize::{normalize, NormalizedUpdate};
pub use sink::{ErrorSink, UpdateApplier};
pub use transport::{Transport, TransportEvent};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use tether_types::{
    ConnectionState, Container, Entity, Push, Request, Response, Update, User, UserId,
};

use cache::EntityCache;
use queue::DispatchQueue;
use seq::{SeqCheck, SeqTracker};

// ─── Config ──────────────────────────────────────────────────────────────────

/// Gateway tuning knobs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Coalescing window of the update dispatch queue. Bursts arriving
    /// within one window are delivered as a single batch.
    pub flush_window: Duration,
    /// How long [`Gateway::destroy`] waits for the logout request before
    /// tearing down anyway.
    pub logout_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flush_window:   Duration::from_millis(10),
            logout_timeout: Duration::from_millis(2500),
        }
    }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

struct GatewayInner {
    transport:    Arc<dyn Transport>,
    cache:        EntityCache,
    queue:        DispatchQueue,
    connection:   Mutex<ConnectionState>,
    seq:          Mutex<SeqTracker>,
    error_sink:   Arc<dyn ErrorSink>,
    current_user: Mutex<Option<UserId>>,
    config:       Config,
}

/// The gateway. Cheap to clone — internally Arc-wrapped.
#[derive(Clone)]
pub struct Gateway {
    pub(crate) inner: Arc<GatewayInner>,
}

impl Gateway {
    /// Wire up the gateway and spawn its background tasks: the transport
    /// event pump and the batch dispatcher.
    ///
    /// `events` is the channel the transport delivers pushes and
    /// connection-state transitions on. The initial connection state is
    /// `Connecting` until the transport signals otherwise.
    pub fn new(
        transport:  Arc<dyn Transport>,
        events:     mpsc::UnboundedReceiver<TransportEvent>,
        applier:    Arc<dyn UpdateApplier>,
        error_sink: Arc<dyn ErrorSink>,
        config:     Config,
    ) -> Self {
        let queue = DispatchQueue::new(applier, config.flush_window);

        let gateway = Self {
            inner: Arc::new(GatewayInner {
                transport,
                cache:        EntityCache::new(),
                queue,
                connection:   Mutex::new(ConnectionState::Connecting),
                seq:          Mutex::new(SeqTracker::new()),
                error_sink,
                current_user: Mutex::new(None),
                config,
            }),
        };

        gateway.spawn_event_pump(events);
        info!("[gateway] started");
        gateway
    }

    fn spawn_event_pump(&self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        let gateway = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    TransportEvent::Push(push) => gateway.process_push(push).await,
                    TransportEvent::Connection(state) => {
                        gateway.apply_connection_state(state).await;
                    }
                }
            }
            debug!("[gateway] transport event channel closed");
        });
    }

    // ── Connection state ───────────────────────────────────────────────────

    pub async fn connection_state(&self) -> ConnectionState {
        *self.inner.connection.lock().await
    }

    async fn apply_connection_state(&self, state: ConnectionState) {
        *self.inner.connection.lock().await = state;
        info!("[gateway] connection state: {state:?}");
        self.inner.queue.enqueue(NormalizedUpdate::ConnectionSignal(state)).await;
    }

    // ── Update pipeline ────────────────────────────────────────────────────

    /// Route one raw push (transport-originated or response-embedded)
    /// through sequence bookkeeping, normalization, the entity cache and the
    /// dispatch queue.
    pub(crate) async fn process_push(&self, push: Push) {
        if let Push::Container(container) = &push {
            let mut seq = self.inner.seq.lock().await;
            match seq.check(container.seq_start, container.seq) {
                SeqCheck::Ok          => seq.advance(container.seq),
                SeqCheck::Unsequenced => {}
                SeqCheck::Duplicate => {
                    debug!("[gateway] duplicate container (seq {}) discarded", container.seq);
                    return;
                }
                SeqCheck::Gap { expected, got } => {
                    warn!("[gateway] seq gap: expected {expected}, got {got} — requesting resync");
                    drop(seq);
                    self.inner.queue
                        .enqueue(NormalizedUpdate::Single(Update::TooLong))
                        .await;
                    return;
                }
            }
        }

        if matches!(push, Push::TooLong) {
            // The server may send this when the session was revoked rather
            // than when updates were merely missed; probe to tell the two
            // apart.
            self.spawn_session_probe();
        }

        debug!("[gateway] push {}", push.name());
        match normalize(push) {
            NormalizedUpdate::Many { updates, entities } => {
                // Entities land in the cache before their updates are
                // enqueued, so update consumers can already resolve them.
                self.inner.cache.merge(&entities).await;
                self.cache_update_messages(&updates).await;
                if updates.is_empty() {
                    return; // entity-only container: cache writes, nothing to deliver
                }
                self.inner.queue
                    .enqueue(NormalizedUpdate::Many { updates, entities })
                    .await;
            }
            NormalizedUpdate::Single(update) => {
                self.cache_update_messages(std::slice::from_ref(&update)).await;
                self.inner.queue.enqueue(NormalizedUpdate::Single(update)).await;
            }
            signal @ NormalizedUpdate::ConnectionSignal(_) => {
                self.inner.queue.enqueue(signal).await;
            }
        }
    }

    /// Merge a response's embedded entities, then enqueue its embedded
    /// updates. Called by the invoker on every successful response unless
    /// update extraction was suppressed.
    pub(crate) async fn absorb_response(&self, response: &Response) {
        let entities = response.embedded_entities();
        if !entities.is_empty() {
            self.inner.cache.merge(&entities).await;
        }
        if let Some(push) = response.embedded_push() {
            self.process_push(push.clone()).await;
        }
    }

    /// Cache messages carried inside updates when they hold media, so their
    /// descriptors (and file references) are resolvable for later fetches.
    async fn cache_update_messages(&self, updates: &[Update]) {
        let messages: Vec<Entity> = updates
            .iter()
            .filter_map(|update| match update {
                Update::NewMessage(m) | Update::MessageEdited(m) if m.media.is_some() => {
                    Some(Entity::Message(m.clone()))
                }
                _ => None,
            })
            .collect();
        if !messages.is_empty() {
            self.inner.cache.merge(&messages).await;
        }
    }

    fn spawn_session_probe(&self) {
        let gateway = self.clone();
        tokio::spawn(async move {
            let params = InvokeParams::new().ignore_updates(true);
            if let Err(error) = gateway.invoke_strict(&Request::GetSelf, params).await {
                if error.is_auth_revoked() {
                    warn!("[gateway] session terminated server-side: {error}");
                    gateway.apply_connection_state(ConnectionState::Broken).await;
                }
            }
        });
    }

    // ── Resynchronization ──────────────────────────────────────────────────

    /// Fetch and apply all updates missed since the last known sequence.
    ///
    /// Loops over difference slices until the server marks the result final.
    /// The application typically calls this in response to an
    /// [`Update::TooLong`] in the applied stream.
    pub async fn get_difference(&self) -> Result<(), InvocationError> {
        loop {
            let local_seq = self.inner.seq.lock().await.seq;
            let request = Request::GetDifference { seq: local_seq };
            let response = self
                .invoke_strict(&request, InvokeParams::new().ignore_updates(true))
                .await?;
            let Response::Difference { updates, users, chats, seq, is_final } = response else {
                return Err(InvocationError::Unexpected(
                    "getDifference returned a non-difference response".into(),
                ));
            };

            info!(
                "[gateway] difference: {} updates, {} users, {} chats (seq {seq})",
                updates.len(), users.len(), chats.len(),
            );
            // Deliver through the normal container path. The slice is
            // unsequenced on purpose — the tracker is advanced from the
            // returned state below, not from container bookkeeping.
            self.process_push(Push::Container(Container {
                updates, users, chats, seq_start: 0, seq: 0,
            }))
            .await;
            self.inner.seq.lock().await.advance(seq);

            if is_final {
                return Ok(());
            }
        }
    }

    // ── Session ────────────────────────────────────────────────────────────

    /// Fetch and cache the logged-in user, remembering the current user id.
    pub async fn fetch_self(&self) -> Option<User> {
        let response = self.invoke(&Request::GetSelf, InvokeParams::default()).await?;
        let Response::Users(users) = response else {
            return None;
        };
        let user = users.into_iter().next()?;
        *self.inner.current_user.lock().await = Some(user.id);
        info!("[gateway] current user: {}", user.display_name());
        Some(user)
    }

    pub async fn current_user_id(&self) -> Option<UserId> {
        *self.inner.current_user.lock().await
    }

    /// Tear down the session: best-effort logout (bounded by
    /// `Config::logout_timeout`), then clear the entity cache and forget the
    /// sequence state.
    pub async fn destroy(&self, no_log_out: bool) {
        if !no_log_out && self.connection_state().await == ConnectionState::Connected {
            let request = Request::LogOut;
            let logout = self.invoke_strict(&request, InvokeParams::new().ignore_updates(true));
            if tokio::time::timeout(self.inner.config.logout_timeout, logout).await.is_err() {
                warn!("[gateway] logout timed out");
            }
        }

        self.inner.cache.clear().await;
        self.inner.seq.lock().await.reset();
        *self.inner.current_user.lock().await = None;
        info!("[gateway] destroyed");
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    /// The entity reference cache.
    pub fn cache(&self) -> &EntityCache {
        &self.inner.cache
    }
}
