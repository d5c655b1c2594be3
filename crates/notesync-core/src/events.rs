//! Note event types and event bus for change notifications.
//!
//! The synchronizer emits a [`NoteEvent`] for every completed operation and
//! for every degradation it absorbs (an unresolvable image, a failed purge).
//! Consumers such as a UI status line or telemetry subscribe independently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Domain events emitted by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoteEvent {
    /// A refresh completed and its result was published.
    Refreshed { ticket: u64, note_count: usize },
    /// A note was created (and its image uploaded, if any).
    Created { note_id: String, has_image: bool },
    /// A note record was deleted.
    Deleted { note_id: String },
    /// A note's image URL could not be resolved; the note is shown without it.
    ImageUnavailable { note_id: String, reason: String },
    /// An image upload failed after its record was created.
    UploadFailed {
        note_id: String,
        compensated: bool,
        reason: String,
    },
    /// Removing a deleted note's stored image failed.
    ImagePurgeFailed { note_id: String, path: String },
    /// The user signed out and the note sequence was cleared.
    SignedOut,
}

impl NoteEvent {
    /// Dot-namespaced event type, e.g. `"note.created"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            NoteEvent::Refreshed { .. } => "notes.refreshed",
            NoteEvent::Created { .. } => "note.created",
            NoteEvent::Deleted { .. } => "note.deleted",
            NoteEvent::ImageUnavailable { .. } => "note.image_unavailable",
            NoteEvent::UploadFailed { .. } => "note.upload_failed",
            NoteEvent::ImagePurgeFailed { .. } => "note.image_purge_failed",
            NoteEvent::SignedOut => "session.signed_out",
        }
    }

    /// Id of the note this event concerns, if any.
    pub fn note_id(&self) -> Option<&str> {
        match self {
            NoteEvent::Created { note_id, .. }
            | NoteEvent::Deleted { note_id }
            | NoteEvent::ImageUnavailable { note_id, .. }
            | NoteEvent::UploadFailed { note_id, .. }
            | NoteEvent::ImagePurgeFailed { note_id, .. } => Some(note_id),
            NoteEvent::Refreshed { .. } | NoteEvent::SignedOut => None,
        }
    }
}

/// Event wrapper carrying id and timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// UUIDv7, so ids sort by emission time.
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: NoteEvent,
}

impl EventEnvelope {
    pub fn new(payload: NoteEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: payload.event_type(),
            occurred_at: Utc::now(),
            payload,
        }
    }
}

/// Broadcast bus for [`NoteEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an event to all subscribers.
    ///
    /// With no active subscribers the event is dropped.
    pub fn emit(&self, event: NoteEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::debug!(
            event_type = envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();

        bus.emit(NoteEvent::Deleted {
            note_id: "abc".to_string(),
        });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event_type, "note.deleted");
        assert_eq!(envelope.payload.note_id(), Some("abc"));
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(32);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(NoteEvent::Refreshed {
            ticket: 3,
            note_count: 2,
        });

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.payload, e2.payload);
        assert_eq!(e1.event_type, "notes.refreshed");
        assert!(e1.payload.note_id().is_none());
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers_ok() {
        let bus = EventBus::new(32);
        bus.emit(NoteEvent::SignedOut);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(NoteEvent::ImageUnavailable {
            note_id: "n1".into(),
            reason: "expired".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "image_unavailable");
        assert_eq!(json["note_id"], "n1");
    }
}
