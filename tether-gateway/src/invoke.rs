//! The request invoker: connection gating, response post-processing, error
//! classification.
//!
//! The default entry point is [`Gateway::invoke`]: failures are classified,
//! reported to the error sink and collapsed to `None`, which keeps calling
//! code to an absence check instead of pervasive error handling. Call sites
//! that must react precisely (the repair protocol, auth-sensitive flows) use
//! [`Gateway::invoke_strict`] and get the classified error back. The invoker
//! never retries — callers that need a retry re-issue the request
//! themselves, and the reference repair protocol is the only place that
//! does.

use tracing::{debug, warn};

use tether_types::{ConnectionState, Request, Response, ShardId};

use crate::errors::{ErrorEnvelope, InvocationError};
use crate::Gateway;

// ─── InvokeParams ────────────────────────────────────────────────────────────

/// Per-call invocation options.
///
/// ```rust
/// use tether_gateway::InvokeParams;
/// use tether_types::ShardId;
///
/// let params = InvokeParams::new().ignore_updates(true).shard(ShardId(4));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeParams {
    /// Skip update/entity extraction from the response — for requests the
    /// caller knows produce no useful push data, or absorbs itself.
    pub ignore_updates: bool,
    /// Target backend shard; `None` = current.
    pub shard: Option<ShardId>,
}

impl InvokeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_updates(mut self, v: bool) -> Self {
        self.ignore_updates = v;
        self
    }

    pub fn shard(mut self, shard: ShardId) -> Self {
        self.shard = Some(shard);
        self
    }
}

// ─── Invoker ─────────────────────────────────────────────────────────────────

impl Gateway {
    /// Issue a request. On failure the classified error goes to the error
    /// sink and `None` is returned.
    pub async fn invoke(&self, request: &Request, params: InvokeParams) -> Option<Response> {
        match self.invoke_inner(request, &params).await {
            Ok(response) => Some(response),
            Err(error) => {
                warn!("[gateway] {} failed: {error}", request.method());
                self.inner.error_sink.report(ErrorEnvelope::classify(request, error));
                None
            }
        }
    }

    /// Issue a request, propagating the classified error to the caller
    /// instead of reporting it.
    pub async fn invoke_strict(
        &self,
        request: &Request,
        params:  InvokeParams,
    ) -> Result<Response, InvocationError> {
        self.invoke_inner(request, &params).await
    }

    /// Issue a request and coerce any successful response to `true`.
    pub async fn invoke_ok(&self, request: &Request, params: InvokeParams) -> bool {
        self.invoke(request, params).await.is_some()
    }

    /// Fire-and-forget: issue the request in the background, ignore the
    /// outcome entirely (no sink report). Used on teardown paths where
    /// nobody is left to care.
    pub fn invoke_beacon(&self, request: Request) {
        debug!("[gateway] beacon {}", request.method());
        let gateway = self.clone();
        tokio::spawn(async move {
            let _ = gateway
                .invoke_strict(&request, InvokeParams::new().ignore_updates(true))
                .await;
        });
    }

    async fn invoke_inner(
        &self,
        request: &Request,
        params:  &InvokeParams,
    ) -> Result<Response, InvocationError> {
        // Gate before touching the transport at all.
        if self.connection_state().await != ConnectionState::Connected {
            return Err(InvocationError::Disconnected);
        }

        debug!("[gateway] invoke {}", request.method());
        let response = self.inner.transport.invoke(request, params.shard).await?;

        if !params.ignore_updates {
            self.absorb_response(&response).await;
        }
        Ok(response)
    }
}
