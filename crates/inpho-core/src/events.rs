//! Pipeline progress events and the broadcast bus that carries them.
//!
//! A mining run emits one event per phase transition plus a terminal
//! `RunCompleted` or `RunFailed`. Consumers (CLI progress output, tests)
//! subscribe independently; a run with no subscribers drops events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{EntityKind, PipelinePhase};

/// Domain events emitted by a mining run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    RunStarted {
        run_id: Uuid,
        kind: EntityKind,
    },
    PhaseStarted {
        run_id: Uuid,
        phase: PipelinePhase,
    },
    PhaseCompleted {
        run_id: Uuid,
        phase: PipelinePhase,
        duration_ms: u64,
    },
    /// One article was scanned (or skipped because its text was missing).
    ArticleScanned {
        run_id: Uuid,
        article: String,
        sentence_count: usize,
        skipped: bool,
    },
    RunCompleted {
        run_id: Uuid,
        edge_count: usize,
        duration_ms: u64,
    },
    RunFailed {
        run_id: Uuid,
        phase: PipelinePhase,
        error: String,
    },
}

impl PipelineEvent {
    /// Dot-namespaced event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::PhaseStarted { .. } => "phase.started",
            Self::PhaseCompleted { .. } => "phase.completed",
            Self::ArticleScanned { .. } => "article.scanned",
            Self::RunCompleted { .. } => "run.completed",
            Self::RunFailed { .. } => "run.failed",
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::PhaseStarted { run_id, .. }
            | Self::PhaseCompleted { run_id, .. }
            | Self::ArticleScanned { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// An event stamped with its emission time.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// UUIDv7, so envelopes sort by emission time.
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: PipelineEvent,
}

impl EventEnvelope {
    pub fn new(payload: PipelineEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: payload.event_type(),
            occurred_at: Utc::now(),
            payload,
        }
    }
}

/// Broadcast bus for pipeline events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: PipelineEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::trace!(
            event_type = envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();
        let run_id = Uuid::now_v7();

        bus.emit(PipelineEvent::PhaseStarted {
            run_id,
            phase: PipelinePhase::Mining,
        });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event_type, "phase.started");
        assert_eq!(envelope.payload.run_id(), run_id);
        assert!(matches!(
            envelope.payload,
            PipelineEvent::PhaseStarted {
                phase: PipelinePhase::Mining,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers_ok() {
        let bus = EventBus::new(4);
        bus.emit(PipelineEvent::RunFailed {
            run_id: Uuid::now_v7(),
            phase: PipelinePhase::Scanning,
            error: "boom".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_pipeline_event_json() {
        let event = PipelineEvent::RunStarted {
            run_id: Uuid::nil(),
            kind: EntityKind::Thinker,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RunStarted");
        assert_eq!(json["kind"], "thinker");
    }
}
