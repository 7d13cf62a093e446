use std::path::PathBuf;

use mail_parser::{Address, HeaderValue, MessageParser};

use crate::context::UnifyContext;
use crate::hlc::Hlc;
use crate::ingest::EventSource;
use crate::model::{BridgeMode, Event, EventPayload, MessageBody, MessageRel, Security, Source};
use crate::time::Timestamp;
use crate::Result;

/// Reads a directory of `.eml` files (RFC 5322) read-only (§6). Each file
/// becomes one MESSAGE event; thread membership is resolved from
/// `References` (first entry), falling back to `In-Reply-To`, falling back
/// to the message's own `Message-ID` as a singleton thread.
pub struct EmlSource {
    pub dir_path: PathBuf,
}

fn header_text(value: &HeaderValue) -> Option<String> {
    match value {
        HeaderValue::Text(t) => Some(t.trim().trim_matches(|c| c == '<' || c == '>').to_owned()),
        HeaderValue::TextList(list) => {
            list.first().map(|t| t.trim().trim_matches(|c| c == '<' || c == '>').to_owned())
        }
        _ => None,
    }
}

fn from_address(address: Option<&Address>) -> (Option<String>, Option<String>) {
    let Some(address) = address else { return (None, None) };
    let Some(addr) = address.first() else { return (None, None) };
    (addr.address().map(|a| a.to_string()), addr.name().map(|n| n.to_string()))
}

fn thread_root_id(message: &mail_parser::Message, message_id: &str) -> String {
    if let Some(id) = header_text(message.references()) {
        if !id.is_empty() {
            return id;
        }
    }
    if let Some(id) = header_text(message.in_reply_to()) {
        return id;
    }
    message_id.to_owned()
}

impl EventSource for EmlSource {
    fn ingest(&self, _ctx: &UnifyContext, person_did: &str, hlc: &mut Hlc) -> Result<Vec<Event>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("eml")))
            .collect();
        paths.sort();

        let parser = MessageParser::default();
        let mut events = Vec::new();
        for path in paths {
            let raw = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("Could not read {}: {e}", path.display());
                    continue;
                }
            };
            let Some(message) = parser.parse(&raw) else {
                log::warn!("Could not parse {} as RFC 5322 message", path.display());
                continue;
            };

            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let message_id = message.message_id().map(|s| s.to_owned()).unwrap_or_else(|| file_name.clone());
            let (from_addr, display_name) = from_address(message.from());
            let sender = from_addr.unwrap_or_else(|| "unknown".to_owned());
            let thread_id = thread_root_id(&message, &message_id);
            let time_event = message.date().map(|d| Timestamp::from_unix_seconds(d.to_timestamp())).unwrap_or_else(Timestamp::now);
            let in_reply_to = header_text(message.in_reply_to());
            let text = message.body_text(0).map(|c| c.into_owned());

            events.push(Event {
                event_id: message_id.clone(),
                person_did: person_did.to_owned(),
                source: Source {
                    service: "email".to_owned(),
                    id: message_id.clone(),
                    sender,
                    route: Some("email".to_owned()),
                    chat_guid: None,
                    display_name,
                },
                time_event,
                time_observed: Timestamp::now(),
                hlc: hlc.now(),
                security: Security { e2e: false, bridge_mode: BridgeMode::None },
                provenance: vec![format!("eml {file_name}")],
                tombstone: None,
                payload: EventPayload::Message {
                    body: MessageBody { text, format: "text/plain".to_owned() },
                    rel: MessageRel {
                        conversation_id: Some(format!("email:thread:{thread_id}")),
                        participants: vec![],
                        in_reply_to,
                        message_id: Some(message_id),
                    },
                    attachments: vec![],
                },
            });
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_text_strips_angle_brackets() {
        let v = HeaderValue::Text("<abc123@example.com>".into());
        assert_eq!(header_text(&v), Some("abc123@example.com".to_owned()));
    }

    #[test]
    fn header_text_from_list_picks_first() {
        let v = HeaderValue::TextList(vec!["<first@x>".into(), "<second@x>".into()]);
        assert_eq!(header_text(&v), Some("first@x".to_owned()));
    }
}
