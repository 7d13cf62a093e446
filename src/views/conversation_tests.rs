use chrono::{Local, TimeZone};

use crate::model::{BridgeMode, EventPayload, MessageBody, MessageRel, Security, Source};
use crate::time::Timestamp;

use super::*;

fn ts(unix_seconds: i64) -> Timestamp {
    Timestamp(Local.timestamp_opt(unix_seconds, 0).unwrap())
}

fn message_in(event_id: &str, conversation_id: &str, sender: &str, hlc: &str, time_event: Timestamp, text: &str) -> Event {
    Event {
        event_id: event_id.to_owned(),
        person_did: "did:person:1".to_owned(),
        source: Source { service: "imessage".to_owned(), id: event_id.to_owned(), sender: sender.to_owned(), route: None, chat_guid: None, display_name: None },
        time_event,
        time_observed: time_event,
        hlc: hlc.to_owned(),
        security: Security { e2e: true, bridge_mode: BridgeMode::OnDevice },
        provenance: vec![],
        tombstone: None,
        payload: EventPayload::Message {
            body: MessageBody { text: Some(text.to_owned()), format: "text/plain".to_owned() },
            rel: MessageRel { conversation_id: Some(conversation_id.to_owned()), participants: vec![sender.to_owned()], in_reply_to: None, message_id: None },
            attachments: vec![],
        },
    }
}

#[test]
fn groups_by_conversation_with_header() {
    let events = vec![
        message_in("e1", "chat:1", "+14105551234", "100:0:n", ts(1000), "hi"),
        message_in("e2", "chat:1", "+14105555678", "100:1:n", ts(1001), "hey"),
    ];
    let options = ConversationOptions::default();
    let entries = get_conversation(events, &options);
    assert!(matches!(entries[0], ViewEntry::Header(_)));
    if let ViewEntry::Header(header) = &entries[0] {
        assert_eq!(header.conversation_id, "chat:1");
        assert_eq!(header.participants.len(), 2);
    }
    assert_eq!(entries.len(), 3);
}

#[test]
fn ungrouped_returns_flat_items() {
    let events = vec![message_in("e1", "chat:1", "+14105551234", "100:0:n", ts(1000), "hi")];
    let options = ConversationOptions { group_by_conversation: false, ..ConversationOptions::default() };
    let entries = get_conversation(events, &options);
    assert_eq!(entries.len(), 1);
    assert!(matches!(entries[0], ViewEntry::Item(_)));
}

#[test]
fn list_chats_counts_messages_per_room() {
    let events = vec![
        message_in("e1", "chat:1", "+14105551234", "100:0:n", ts(1000), "hi"),
        message_in("e2", "chat:1", "+14105551234", "100:1:n", ts(1001), "there"),
        message_in("e3", "chat:2", "+14105555678", "100:2:n", ts(1002), "yo"),
    ];
    let summaries = list_chats(events, &ConversationOptions::default());
    assert_eq!(summaries.len(), 2);
    let chat1 = summaries.iter().find(|c| c.conversation_id == "chat:1").unwrap();
    assert_eq!(chat1.message_count, 2);
}

#[test]
fn resolve_display_overrides_raw_sender_in_header() {
    let events = vec![message_in("e1", "chat:1", "+14105551234", "100:0:n", ts(1000), "hi")];
    let resolver = |sender: &str| format!("Alex ({sender})");
    let options = ConversationOptions { resolve_display: Some(&resolver), ..ConversationOptions::default() };
    let entries = get_conversation(events, &options);
    if let ViewEntry::Header(header) = &entries[0] {
        assert_eq!(header.participants[0], "Alex (+14105551234)");
    } else {
        panic!("expected header first");
    }
}
