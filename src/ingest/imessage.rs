use std::path::PathBuf;

use rusqlite::Connection;

use crate::context::UnifyContext;
use crate::hlc::Hlc;
use crate::ingest::EventSource;
use crate::model::{Attachment, BridgeMode, Event, EventPayload, MessageBody, MessageRel, Security, Source};
use crate::sanitize::decode_attributed_body;
use crate::time::apple_ts_to_local;
use crate::Result;

/// Reads Apple Messages' `chat.db` read-only (§5, §6): joins `message` with
/// `handle`, `chat_message_join` with `chat`, `chat_handle_join` for
/// participants, and `message_attachment_join` with `attachment`. Tapback
/// association types 2000-2006 become REACTION events; type 1000 marks a
/// reply. The date column's unit is auto-detected (§4.A) since it varies
/// seconds/ns across macOS versions.
pub struct ChatDbSource {
    pub db_path: PathBuf,
}

const TAPBACK_TYPES: [i64; 7] = [2000, 2001, 2002, 2003, 2004, 2005, 2006];
const REPLY_ASSOCIATION_TYPE: i64 = 1000;

struct Row {
    rowid: i64,
    guid: String,
    text: Option<String>,
    attributed_body: Option<Vec<u8>>,
    date: Option<i64>,
    handle_id_text: Option<String>,
    is_from_me: bool,
    chat_guid: String,
    associated_message_guid: Option<String>,
    associated_message_type: Option<i64>,
}

impl EventSource for ChatDbSource {
    fn ingest(&self, _ctx: &UnifyContext, person_did: &str, hlc: &mut Hlc) -> Result<Vec<Event>> {
        let conn = Connection::open_with_flags(&self.db_path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.execute_batch("PRAGMA query_only = true;")?;

        let mut stmt = conn.prepare(
            "SELECT m.ROWID, m.guid, m.text, m.attributedBody, m.date, h.id, m.is_from_me,
                    c.guid, m.associated_message_guid, m.associated_message_type
             FROM message m
             JOIN chat_message_join cmj ON cmj.message_id = m.ROWID
             JOIN chat c ON c.ROWID = cmj.chat_id
             LEFT JOIN handle h ON h.ROWID = m.handle_id
             ORDER BY m.date ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Row {
                rowid: row.get(0)?,
                guid: row.get(1)?,
                text: row.get(2)?,
                attributed_body: row.get(3)?,
                date: row.get(4)?,
                handle_id_text: row.get(5)?,
                is_from_me: row.get::<_, i64>(6)? != 0,
                chat_guid: row.get(7)?,
                associated_message_guid: row.get(8)?,
                associated_message_type: row.get(9)?,
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Skipping malformed chat.db row: {e}");
                    continue;
                }
            };
            let participants = self.participants(&conn, &row.chat_guid).unwrap_or_default();
            let attachments = load_attachments(&conn, row.rowid);
            match self.row_to_event(row, person_did, &participants, attachments, hlc) {
                Some(event) => events.push(event),
                None => continue,
            }
        }
        Ok(events)
    }
}

impl ChatDbSource {
    fn participants(&self, conn: &Connection, chat_guid: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT h.id FROM chat_handle_join chj
             JOIN chat c ON c.ROWID = chj.chat_id
             JOIN handle h ON h.ROWID = chj.handle_id
             WHERE c.guid = ?1",
        )?;
        let names = stmt.query_map([chat_guid], |row| row.get::<_, String>(0))?;
        Ok(names.filter_map(|r| r.ok()).collect())
    }

    fn row_to_event(&self, row: Row, person_did: &str, participants: &[String], attachments: Vec<Attachment>, hlc: &mut Hlc) -> Option<Event> {
        let sender = if row.is_from_me { "me".to_owned() } else { row.handle_id_text.clone().unwrap_or_default() };
        let time_event = apple_ts_to_local(row.date);
        let source = Source {
            service: "imessage".to_owned(),
            id: row.guid.clone(),
            sender,
            route: None,
            chat_guid: Some(row.chat_guid.clone()),
            display_name: None,
        };
        let security = Security { e2e: true, bridge_mode: BridgeMode::OnDevice };
        let base_hlc = hlc.now();

        if let Some(assoc_type) = row.associated_message_type {
            if TAPBACK_TYPES.contains(&assoc_type) {
                let target = row.associated_message_guid.clone()?;
                return Some(Event {
                    event_id: row.guid,
                    person_did: person_did.to_owned(),
                    source,
                    time_event,
                    time_observed: crate::time::Timestamp::now(),
                    hlc: base_hlc,
                    security,
                    provenance: vec!["imessage:chat.db".to_owned()],
                    tombstone: None,
                    payload: EventPayload::Reaction { target_event_id: target, reaction: assoc_type.to_string() },
                });
            }
            if assoc_type == REPLY_ASSOCIATION_TYPE {
                let target = row.associated_message_guid.clone();
                let text = self.resolve_text(row.text.as_deref(), row.attributed_body.as_deref());
                return Some(Event {
                    event_id: row.guid,
                    person_did: person_did.to_owned(),
                    source,
                    time_event,
                    time_observed: crate::time::Timestamp::now(),
                    hlc: base_hlc,
                    security,
                    provenance: vec!["imessage:chat.db".to_owned()],
                    tombstone: None,
                    payload: EventPayload::Message {
                        body: MessageBody { text, format: "text/plain".to_owned() },
                        rel: MessageRel { conversation_id: Some(format!("imessage:chat:{}", row.chat_guid)), participants: participants.to_vec(), in_reply_to: target, message_id: Some(row.rowid.to_string()) },
                        attachments,
                    },
                });
            }
        }

        let text = self.resolve_text(row.text.as_deref(), row.attributed_body.as_deref());
        Some(Event {
            event_id: row.guid,
            person_did: person_did.to_owned(),
            source,
            time_event,
            time_observed: crate::time::Timestamp::now(),
            hlc: base_hlc,
            security,
            provenance: vec!["imessage:chat.db".to_owned()],
            tombstone: None,
            payload: EventPayload::Message {
                body: MessageBody { text, format: "text/plain".to_owned() },
                rel: MessageRel { conversation_id: Some(format!("imessage:chat:{}", row.chat_guid)), participants: participants.to_vec(), in_reply_to: None, message_id: Some(row.rowid.to_string()) },
                attachments,
            },
        })
    }

    fn resolve_text(&self, text: Option<&str>, attributed_body: Option<&[u8]>) -> Option<String> {
        match text {
            Some(t) if !t.is_empty() => Some(t.to_owned()),
            _ => attributed_body.map(decode_attributed_body).filter(|s| !s.is_empty()),
        }
    }
}

/// Attachment metadata for a message, joined from `message_attachment_join`
/// and `attachment` (§6). File bytes are never copied here (no write-back,
/// spec.md §1 Non-goals) — only the source path is recorded; a failure to
/// stat the file is a logged warning (§7 `AttachmentCopyFailed`), not fatal.
pub fn load_attachments(conn: &Connection, message_rowid: i64) -> Vec<Attachment> {
    let mut stmt = match conn.prepare(
        "SELECT a.filename, a.mime_type, a.transfer_name
         FROM message_attachment_join maj
         JOIN attachment a ON a.ROWID = maj.attachment_id
         WHERE maj.message_id = ?1",
    ) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("Could not prepare attachment query: {e}");
            return vec![];
        }
    };
    let rows = stmt.query_map([message_rowid], |row| {
        Ok(Attachment {
            uri: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
            mime: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        })
    });
    match rows {
        Ok(rows) => rows
            .filter_map(|r| match r {
                Ok(a) => Some(a),
                Err(e) => {
                    log::warn!("Skipping malformed attachment row: {e}");
                    None
                }
            })
            .collect(),
        Err(e) => {
            log::warn!("Could not load attachments for message {message_rowid}: {e}");
            vec![]
        }
    }
}
