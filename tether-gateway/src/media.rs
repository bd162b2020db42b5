//! Media fetch support: one-shot stale-reference repair and cooperative
//! download progress.
//!
//! File references expire server-side. When a fetch fails with the
//! stale-reference error family, the owning message is re-fetched once —
//! refreshing the cached descriptor and the reference embedded in it — and
//! the original fetch is retried exactly once with the fresh reference. A
//! failed repair, or a second stale error, is surfaced as-is: recovery is
//! bounded to a single attempt so a permanently invalid reference can never
//! loop.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use tether_types::{FileReference, MediaId, Request, Response};

use crate::errors::InvocationError;
use crate::invoke::InvokeParams;
use crate::Gateway;

// ─── ProgressHandle ──────────────────────────────────────────────────────────

struct ProgressInner {
    cancelled:   AtomicBool,
    on_progress: Box<dyn Fn(u64, u64) + Send + Sync>,
}

/// Cooperative progress reporting for a media download.
///
/// The transport cannot abort an in-flight transfer; cancelling a download
/// means setting this flag so further progress callbacks are dropped while
/// the transfer quietly runs out.
#[derive(Clone)]
pub struct ProgressHandle {
    inner: Arc<ProgressInner>,
}

impl ProgressHandle {
    /// Wrap a progress callback `(transferred, total)`.
    pub fn new(on_progress: impl Fn(u64, u64) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(ProgressInner {
                cancelled:   AtomicBool::new(false),
                on_progress: Box::new(on_progress),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Relaxed)
    }

    /// Forward a progress step to the callback; a no-op once cancelled.
    pub fn report(&self, transferred: u64, total: u64) {
        if self.is_cancelled() {
            return;
        }
        (self.inner.on_progress)(transferred, total);
    }
}

// ─── Repair & fetch ──────────────────────────────────────────────────────────

impl Gateway {
    /// Re-resolve the entity owning a media descriptor after its file
    /// reference went stale.
    ///
    /// Re-fetches the owning message by id through the invoker (strict
    /// mode); merging the response refreshes the cached descriptor and the
    /// reference embedded in it. Returns `true` if the caller may retry the
    /// original fetch — once.
    pub async fn repair_reference(&self, media: MediaId) -> bool {
        let Some(owner) = self.inner.cache.media_owner(media).await else {
            warn!("[repair] no owner known for {media} — cannot repair");
            return false;
        };

        let request = Request::GetMessages { peer: owner.peer, ids: vec![owner.id] };
        match self.invoke_strict(&request, InvokeParams::default()).await {
            Ok(Response::Messages { messages, .. }) if !messages.is_empty() => {
                info!("[repair] refreshed message {} in {}", owner.id, owner.peer);
                true
            }
            Ok(_) => {
                warn!("[repair] message {} in {} no longer resolvable", owner.id, owner.peer);
                false
            }
            Err(error) => {
                warn!("[repair] re-fetch of {} failed: {error}", owner.peer);
                false
            }
        }
    }

    /// Fetch media bytes via the caller-supplied transfer function, with
    /// at most one repair-and-retry on a stale file reference.
    ///
    /// `fetch` receives the currently cached [`FileReference`] and is called
    /// at most twice: the original attempt, plus one retry if repair
    /// succeeded.
    pub async fn fetch_media<F, Fut>(
        &self,
        media: MediaId,
        mut fetch: F,
    ) -> Result<Vec<u8>, InvocationError>
    where
        F:   FnMut(FileReference) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, InvocationError>>,
    {
        let reference = self
            .inner
            .cache
            .file_reference(media)
            .await
            .ok_or_else(|| InvocationError::Unexpected(format!("no cached descriptor for {media}")))?;

        match fetch(reference).await {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.is_stale_reference() => {
                info!("[repair] stale file reference for {media} — repairing");
                if !self.repair_reference(media).await {
                    return Err(error);
                }
                let fresh = self.inner.cache.file_reference(media).await.ok_or_else(|| {
                    InvocationError::Unexpected(format!("descriptor for {media} gone after repair"))
                })?;
                // Second and final attempt; another stale error surfaces as-is.
                fetch(fresh).await
            }
            Err(error) => Err(error),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
