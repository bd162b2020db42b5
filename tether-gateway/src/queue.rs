//! Update dispatch queue: coalesce bursts, deliver ordered batches.
//!
//! Naive per-update delivery would force the applier (and the UI state it
//! drives) to re-render once per pushed update; bursts of dozens of updates
//! (bulk read-state changes, join floods) would saturate the rendering
//! pipeline. The queue buffers enqueued updates and flushes them as one
//! batch after a short coalescing window. Urgent kinds (connection signals,
//! resync markers) replace the scheduled flush with an immediate one under a
//! fresh generation — the superseded flush fires later, sees a stale
//! generation, and is a no-op. Batches travel through an unbounded channel
//! drained by a single dispatcher task, so deliveries can never interleave
//! or reorder at the applier.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::trace;

use crate::normalize::NormalizedUpdate;
use crate::sink::UpdateApplier;

// ─── DispatchQueue ───────────────────────────────────────────────────────────

struct QueueState {
    buffer:          Vec<NormalizedUpdate>,
    /// Only the flush scheduled under the current generation may drain the
    /// buffer; any earlier-generation flush is a no-op.
    generation:      u64,
    flush_scheduled: bool,
}

struct QueueInner {
    state:        Mutex<QueueState>,
    batches:      mpsc::UnboundedSender<Vec<NormalizedUpdate>>,
    flush_window: Duration,
}

/// Process-wide update buffer plus throttling scheduler. Cheap to clone.
#[derive(Clone)]
pub struct DispatchQueue {
    inner: Arc<QueueInner>,
}

impl DispatchQueue {
    /// Create the queue and spawn its dispatcher task, which forwards each
    /// flushed batch to `applier` in flush order.
    pub fn new(applier: Arc<dyn UpdateApplier>, flush_window: Duration) -> Self {
        let (batches, mut rx) = mpsc::unbounded_channel::<Vec<NormalizedUpdate>>();

        tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                applier.apply_batch(batch).await;
            }
        });

        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    buffer:          Vec::new(),
                    generation:      0,
                    flush_scheduled: false,
                }),
                batches,
                flush_window,
            }),
        }
    }

    /// Append an update to the buffer and make sure a flush is on its way.
    ///
    /// The first enqueue after an idle period starts a new generation and
    /// schedules its flush after the coalescing window. An urgent update
    /// re-schedules under a fresh generation with no delay, taking
    /// everything already buffered along with it.
    pub async fn enqueue(&self, update: NormalizedUpdate) {
        let urgent = update.is_urgent();
        let mut state = self.inner.state.lock().await;
        state.buffer.push(update);

        if !state.flush_scheduled {
            state.generation = state.generation.wrapping_add(1);
            state.flush_scheduled = true;
            let delay = if urgent { Duration::ZERO } else { self.inner.flush_window };
            self.schedule_flush(state.generation, delay);
        } else if urgent {
            state.generation = state.generation.wrapping_add(1);
            self.schedule_flush(state.generation, Duration::ZERO);
        }
    }

    fn schedule_flush(&self, generation: u64, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            if delay.is_zero() {
                // Next cooperative-scheduling boundary: batch whatever the
                // current synchronous burst still enqueues.
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            queue.flush(generation).await;
        });
    }

    async fn flush(&self, generation: u64) {
        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            // A newer (urgent) flush already owns the buffer.
            trace!("[queue] stale flush discarded (gen {generation} < {})", state.generation);
            return;
        }
        state.flush_scheduled = false;
        if state.buffer.is_empty() {
            return;
        }

        let batch = mem::take(&mut state.buffer);
        trace!("[queue] flushing {} updates (gen {generation})", batch.len());
        // Sent under the state lock: channel order is flush order.
        let _ = self.inner.batches.send(batch);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use tether_types::{Update, UserId};

    const WINDOW: Duration = Duration::from_millis(10);

    #[derive(Default)]
    struct RecordingApplier {
        batches: std::sync::Mutex<Vec<Vec<NormalizedUpdate>>>,
    }

    #[async_trait]
    impl UpdateApplier for RecordingApplier {
        async fn apply_batch(&self, batch: Vec<NormalizedUpdate>) {
            self.batches.lock().unwrap().push(batch);
        }
    }

    fn status(user: i64) -> NormalizedUpdate {
        NormalizedUpdate::Single(Update::UserStatus { user_id: UserId(user), online: true })
    }

    fn urgent() -> NormalizedUpdate {
        NormalizedUpdate::Single(Update::TooLong)
    }

    async fn settle() {
        // Paused clock: sleeping past the window auto-advances and lets every
        // scheduled flush and the dispatcher task run.
        tokio::time::sleep(WINDOW * 3).await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_into_one_ordered_batch() {
        let applier = Arc::new(RecordingApplier::default());
        let queue = DispatchQueue::new(applier.clone(), WINDOW);

        for i in 0..5i64 {
            queue.enqueue(status(i)).await;
        }
        settle().await;

        let batches = applier.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], (0..5i64).map(status).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn urgent_promotes_without_splitting_the_batch() {
        let applier = Arc::new(RecordingApplier::default());
        let queue = DispatchQueue::new(applier.clone(), WINDOW);

        queue.enqueue(status(1)).await;
        queue.enqueue(status(2)).await;
        queue.enqueue(urgent()).await;
        settle().await;

        // Exactly one batch [1, 2, urgent]: the urgent flush collapsed the
        // window but took the buffered updates along, and the superseded
        // scheduled flush delivered nothing.
        let batches = applier.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec![status(1), status(2), urgent()]);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_lost_or_duplicated_across_flushes() {
        let applier = Arc::new(RecordingApplier::default());
        let queue = DispatchQueue::new(applier.clone(), WINDOW);

        queue.enqueue(status(1)).await;
        queue.enqueue(urgent()).await;
        settle().await;
        queue.enqueue(status(2)).await;
        queue.enqueue(status(3)).await;
        settle().await;

        let batches = applier.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        let delivered: Vec<NormalizedUpdate> = batches.iter().flatten().cloned().collect();
        assert_eq!(delivered, vec![status(1), urgent(), status(2), status(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_queue_flushes_nothing() {
        let applier = Arc::new(RecordingApplier::default());
        let _queue = DispatchQueue::new(applier.clone(), WINDOW);
        settle().await;
        assert!(applier.batches.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_after_flush_starts_a_new_generation() {
        let applier = Arc::new(RecordingApplier::default());
        let queue = DispatchQueue::new(applier.clone(), WINDOW);

        queue.enqueue(status(1)).await;
        settle().await;
        queue.enqueue(status(2)).await;
        settle().await;

        let batches = applier.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], vec![status(1)]);
        assert_eq!(batches[1], vec![status(2)]);
    }
}
