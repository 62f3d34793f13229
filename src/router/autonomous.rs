use super::{ContextPipeline, InboundEvent, PipelineOutcome};
use crate::diagnostics::health;
use crate::scheduler::Broadcast;
use crate::secret::SecretSequence;
use async_trait::async_trait;
use std::sync::Arc;

/// Scheduler-side owner of the secret cursor. Each fire is one
/// [`InboundEvent::AutonomousTick`] through the shared pipeline.
pub struct AutonomousBroadcaster {
    pipeline: Arc<ContextPipeline>,
    sequence: Option<SecretSequence>,
}

impl AutonomousBroadcaster {
    /// `sequence` is `None` when the reveal is disabled; fires then post a
    /// plain batch.
    pub fn new(pipeline: Arc<ContextPipeline>, sequence: Option<SecretSequence>) -> Self {
        Self { pipeline, sequence }
    }

    pub fn sequence(&self) -> Option<&SecretSequence> {
        self.sequence.as_ref()
    }

    pub async fn broadcast(&mut self) -> PipelineOutcome {
        self.pipeline
            .handle(InboundEvent::AutonomousTick, self.sequence.as_mut())
            .await
    }
}

#[async_trait]
impl Broadcast for AutonomousBroadcaster {
    async fn fire(&mut self) {
        let outcome = self.broadcast().await;
        health::record_broadcast(&outcome, self.sequence.as_ref().map(SecretSequence::cursor));
        match &outcome {
            PipelineOutcome::Skipped(reason) => {
                health::mark_component_error("broadcast", format!("skipped: {reason:?}"));
            }
            PipelineOutcome::Delivered { sent: 0, .. }
            | PipelineOutcome::Revealed { sent: false, .. } => {
                health::mark_component_error("broadcast", "nothing delivered");
            }
            _ => health::mark_component_ok("broadcast"),
        }
    }
}
