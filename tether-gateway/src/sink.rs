//! Downstream collaborator seams: the update applier and the error sink.

use async_trait::async_trait;

use crate::errors::ErrorEnvelope;
use crate::normalize::NormalizedUpdate;

/// Consumes the batched, ordered update stream and mutates application
/// state. Called once per flush of the dispatch queue.
#[async_trait]
pub trait UpdateApplier: Send + Sync {
    async fn apply_batch(&self, batch: Vec<NormalizedUpdate>);
}

/// Receives classified request failures under the default
/// report-don't-propagate policy. Typically drives UI-level notification
/// code.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: ErrorEnvelope);
}
