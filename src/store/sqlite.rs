use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::model::Event;
use crate::store::EventStore;
use crate::time::Timestamp;
use crate::Result;

/// SQLite-backed event store (§4.C, §6). One wide `events` table keyed by
/// `event_id`, with materialized columns for the hot filters and the full
/// serialized event in a JSON column — schema created on first open rather
/// than through a migration framework (see DESIGN.md's dependency notes).
pub struct SqliteEventStore {
    conn: Connection,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    event_id      TEXT PRIMARY KEY,
    person_did    TEXT NOT NULL,
    service       TEXT NOT NULL,
    source_id     TEXT NOT NULL,
    conversation_id TEXT,
    time_event    TEXT NOT NULL,
    time_observed TEXT NOT NULL,
    hlc           TEXT NOT NULL,
    e2e           INTEGER NOT NULL,
    bridge_mode   TEXT NOT NULL,
    json          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_person_time ON events(person_did, time_event);
CREATE INDEX IF NOT EXISTS idx_events_conversation_time ON events(conversation_id, time_event);
";

impl SqliteEventStore {
    /// Opens (creating if absent) the event store file. §6 requires the
    /// containing directory to be mode 0700; callers are expected to have
    /// created it that way (this crate's ingestion entry points do, via
    /// `UnifyContext`) — opening itself doesn't chmod an existing directory.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteEventStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteEventStore { conn })
    }

    fn conversation_id(event: &Event) -> Option<String> {
        match &event.payload {
            crate::model::EventPayload::Message { rel, .. } => rel.conversation_id.clone(),
            crate::model::EventPayload::Membership { conversation_id, .. } => Some(conversation_id.clone()),
            _ => None,
        }
    }

    fn bridge_mode_str(mode: crate::model::BridgeMode) -> &'static str {
        match mode {
            crate::model::BridgeMode::OnDevice => "on_device",
            crate::model::BridgeMode::Relay => "relay",
            crate::model::BridgeMode::Direct => "direct",
            crate::model::BridgeMode::None => "none",
        }
    }
}

impl EventStore for SqliteEventStore {
    fn append(&mut self, event: Event) -> Result<()> {
        let json = serde_json::to_string(&event)?;
        let conversation_id = Self::conversation_id(&event);
        self.conn.execute(
            "INSERT OR REPLACE INTO events
             (event_id, person_did, service, source_id, conversation_id, time_event, time_observed, hlc, e2e, bridge_mode, json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                event.event_id,
                event.person_did,
                event.source.service,
                event.source.id,
                conversation_id,
                event.time_event.to_iso8601(),
                event.time_observed.to_iso8601(),
                event.hlc,
                event.security.e2e,
                Self::bridge_mode_str(event.security.bridge_mode),
                json,
            ],
        )?;
        Ok(())
    }

    fn iter_events(&self, person_did: &str, since: Option<Timestamp>, until: Option<Timestamp>) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT json FROM events
             WHERE person_did = ?1
               AND (?2 IS NULL OR time_event >= ?2)
               AND (?3 IS NULL OR time_event <= ?3)
             ORDER BY time_event ASC",
        )?;
        let since_str = since.map(|t| t.to_iso8601());
        let until_str = until.map(|t| t.to_iso8601());
        let rows = stmt.query_map(params![person_did, since_str, until_str], |row| row.get::<_, String>(0))?;
        let mut events = Vec::new();
        for row in rows {
            events.push(serde_json::from_str(&row?)?);
        }
        Ok(events)
    }

    fn contains(&self, event_id: &str) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row("SELECT event_id FROM events WHERE event_id = ?1", params![event_id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}
