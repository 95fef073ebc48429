// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::{Arc, Mutex};

use beryl_domain::CandidatesStored;
use serde_json::json;

/// Event publisher abstraction
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &CandidatesStored);
}

/// A minimal in-memory event bus that stores serialized events.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    inner: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("Failed to acquire lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve and clear all captured events
    pub fn drain(&self) -> Vec<serde_json::Value> {
        let mut guard = self.inner.lock().expect("Failed to acquire lock");
        std::mem::take(&mut *guard)
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: &CandidatesStored) {
        let value = json!({
            "name": event.name,
            "occurred_at": event.occurred_at,
            "payload": event.payload,
        });
        self.inner
            .lock()
            .expect("Failed to acquire lock")
            .push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beryl_domain::{
        CandidatesStoredPayload, DomainEvent, ProviderKind, SearchMode, TrackId,
    };

    #[test]
    fn publish_and_drain_events() {
        let bus = InMemoryEventBus::new();
        assert!(bus.is_empty());

        let payload = CandidatesStoredPayload {
            track_id: TrackId(7),
            provider: ProviderKind::MusicBrainz,
            search_mode: SearchMode::Metadata,
            stored: 3,
        };
        let evt: CandidatesStored = DomainEvent::new("track.candidates.stored", payload);

        bus.publish(&evt);
        assert_eq!(bus.len(), 1);

        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        let v = &drained[0];
        assert_eq!(v["name"], "track.candidates.stored");
        assert_eq!(v["payload"]["stored"], 3);
        assert_eq!(v["payload"]["provider"], "musicbrainz");
        assert!(bus.is_empty());
    }
}
