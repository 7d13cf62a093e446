use std::path::PathBuf;

use rusqlite::Connection;

use crate::context::UnifyContext;
use crate::hlc::Hlc;
use crate::ingest::EventSource;
use crate::model::{BridgeMode, CallDirection, Event, EventPayload, Security, Source};
use crate::time::apple_ts_to_local;
use crate::Result;

/// Reads FaceTime/cellular `call.db` read-only (§6): one row per call, no
/// joins needed. `flags` maps to direction; an unrecognized flag defaults to
/// `in`, matching how the source exporter treats it.
pub struct CallDbSource {
    pub db_path: PathBuf,
}

fn direction_from_flags(flags: i64) -> CallDirection {
    match flags {
        1 => CallDirection::Out,
        3 => CallDirection::Missed,
        _ => CallDirection::In,
    }
}

impl EventSource for CallDbSource {
    fn ingest(&self, _ctx: &UnifyContext, person_did: &str, hlc: &mut Hlc) -> Result<Vec<Event>> {
        let conn = Connection::open_with_flags(&self.db_path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.execute_batch("PRAGMA query_only = true;")?;

        let mut stmt = conn.prepare(
            "SELECT rowid, address, date, duration, flags
             FROM call
             WHERE address IS NOT NULL
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (rowid, address, date, duration, flags) = match row {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Skipping malformed call.db row: {e}");
                    continue;
                }
            };
            let direction = direction_from_flags(flags);
            let time_event = apple_ts_to_local(date);
            let sender = if direction == CallDirection::Out { "me".to_owned() } else { address.clone() };

            events.push(Event {
                event_id: format!("call:{rowid}:{}", date.unwrap_or(0)),
                person_did: person_did.to_owned(),
                source: Source {
                    service: "facetime".to_owned(),
                    id: rowid.to_string(),
                    sender,
                    route: None,
                    chat_guid: None,
                    display_name: None,
                },
                time_event,
                time_observed: crate::time::Timestamp::now(),
                hlc: hlc.now(),
                security: Security { e2e: true, bridge_mode: BridgeMode::OnDevice },
                provenance: vec!["facetime:call.db".to_owned()],
                tombstone: None,
                payload: EventPayload::Call { direction, duration_ms: duration.map(|d| d * 1000) },
            });
        }
        Ok(events)
    }
}
