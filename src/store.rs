//! Append-only, idempotent event store (§4.C).

pub mod memory;
pub mod sqlite;

use crate::model::Event;
use crate::time::Timestamp;
use crate::Result;

/// The store's contract, independent of backend (§4.C operations).
pub trait EventStore {
    fn append(&mut self, event: Event) -> Result<()>;

    /// Time-ordered (ascending `time_event`) events for one person, optionally
    /// bounded. The store does not apply merge-engine ordering (§4.C "Ordering
    /// discipline") — that's the merge engine's job.
    fn iter_events(&self, person_did: &str, since: Option<Timestamp>, until: Option<Timestamp>) -> Result<Vec<Event>>;

    fn contains(&self, event_id: &str) -> Result<bool>;
}

pub use memory::MemoryEventStore;
pub use sqlite::SqliteEventStore;
