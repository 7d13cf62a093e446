use std::collections::HashMap;

use crate::model::Event;
use crate::store::EventStore;
use crate::time::Timestamp;
use crate::Result;

/// In-memory backend, grounded in the teacher's `InMemoryDao` — for tests
/// and callers who don't want file I/O.
#[derive(Default)]
pub struct MemoryEventStore {
    // event_id -> Event. Upsert-by-id gives append idempotence for free.
    events: HashMap<String, Event>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        MemoryEventStore { events: HashMap::new() }
    }
}

impl EventStore for MemoryEventStore {
    fn append(&mut self, event: Event) -> Result<()> {
        self.events.insert(event.event_id.clone(), event);
        Ok(())
    }

    fn iter_events(&self, person_did: &str, since: Option<Timestamp>, until: Option<Timestamp>) -> Result<Vec<Event>> {
        let mut matching: Vec<Event> = self
            .events
            .values()
            .filter(|e| e.person_did == person_did)
            .filter(|e| since.map_or(true, |s| e.time_event >= s))
            .filter(|e| until.map_or(true, |u| e.time_event <= u))
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.time_event);
        Ok(matching)
    }

    fn contains(&self, event_id: &str) -> Result<bool> {
        Ok(self.events.contains_key(event_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{BridgeMode, EventPayload, MessageBody, MessageRel, Security, Source};

    use super::*;

    fn message(event_id: &str, person_did: &str) -> Event {
        Event {
            event_id: event_id.to_owned(),
            person_did: person_did.to_owned(),
            source: Source { service: "imessage".to_owned(), id: event_id.to_owned(), sender: "+14105551234".to_owned(), route: None, chat_guid: None, display_name: None },
            time_event: Timestamp::now(),
            time_observed: Timestamp::now(),
            hlc: "0:0:n".to_owned(),
            security: Security { e2e: true, bridge_mode: BridgeMode::OnDevice },
            provenance: vec![],
            tombstone: None,
            payload: EventPayload::Message { body: MessageBody { text: Some("hi".to_owned()), format: "text/plain".to_owned() }, rel: MessageRel::default(), attachments: vec![] },
        }
    }

    #[test]
    fn append_is_idempotent() {
        let mut store = MemoryEventStore::new();
        store.append(message("e1", "did:person:1")).unwrap();
        store.append(message("e1", "did:person:1")).unwrap();
        let events = store.iter_events("did:person:1", None, None).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn contains_reflects_appends() {
        let mut store = MemoryEventStore::new();
        assert!(!store.contains("e1").unwrap());
        store.append(message("e1", "did:person:1")).unwrap();
        assert!(store.contains("e1").unwrap());
    }
}
