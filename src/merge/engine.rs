use std::collections::HashMap;

use crate::hlc::Hlc;
use crate::identity::handle::normalize_handle_for_matching;
use crate::merge::fingerprint::via_collapse_fingerprint;
use crate::model::{Event, EventPayload, Tombstone, TranscriptItem};
use crate::sanitize::clean_url_text;

type SortKey = (i64, u32, String, String);

fn sort_key(event: &Event) -> SortKey {
    let (wall, counter) = Hlc::sort_key(&event.hlc);
    (wall, counter, event.time_event.to_iso8601(), event.event_id.clone())
}

fn new_message_item(event: &Event) -> TranscriptItem {
    let (body, rel, attachments) = match &event.payload {
        EventPayload::Message { body, rel, attachments } => (body, rel, attachments),
        _ => unreachable!("new_message_item called on non-MESSAGE event"),
    };
    TranscriptItem {
        event_id: event.event_id.clone(),
        kind: "MESSAGE".to_owned(),
        time_event: event.time_event,
        hlc: event.hlc.clone(),
        conversation_id: rel.conversation_id.clone(),
        sender: event.source.sender.clone(),
        text: body.text.clone(),
        format: body.format.clone(),
        attachments: attachments.clone(),
        reactions: vec![],
        tombstone: None,
        via: vec![],
        provenance: event.provenance.clone(),
        direction: None,
        duration_ms: None,
    }
}

fn new_call_item(event: &Event) -> TranscriptItem {
    let (direction, duration_ms) = match &event.payload {
        EventPayload::Call { direction, duration_ms } => (*direction, *duration_ms),
        _ => unreachable!("new_call_item called on non-CALL event"),
    };
    TranscriptItem {
        event_id: event.event_id.clone(),
        kind: "CALL".to_owned(),
        time_event: event.time_event,
        hlc: event.hlc.clone(),
        conversation_id: None,
        sender: event.source.sender.clone(),
        text: None,
        format: "call".to_owned(),
        attachments: vec![],
        reactions: vec![],
        tombstone: None,
        via: vec![],
        provenance: event.provenance.clone(),
        direction: Some(direction),
        duration_ms,
    }
}

/// Step 1 (sort) + step 2 (fold) + optional step 3 (via-collapse) of §4.D.
///
/// `events` must already be restricted to one `person_did` over the desired
/// time window — the store (§4.C), not this function, is responsible for
/// that filtering.
pub fn materialize(events: impl IntoIterator<Item = Event>, via_collapse: bool) -> Vec<TranscriptItem> {
    let mut events: Vec<Event> = events.into_iter().collect();
    events.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let mut items: Vec<TranscriptItem> = Vec::new();
    // event_id -> index into `items`. Via-collapsed duplicates point at the retained item.
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut fingerprint_index: HashMap<u64, usize> = HashMap::new();

    for event in &events {
        match &event.payload {
            EventPayload::Message { body, .. } => {
                if via_collapse {
                    if let Some(text) = body.text.as_deref().filter(|t| !t.is_empty()) {
                        let cleaned_text = clean_url_text(text);
                        let canonical_sender = normalize_handle_for_matching(&event.source.sender);
                        let fp = via_collapse_fingerprint(&cleaned_text, &event.time_event, &canonical_sender);
                        if let Some(&existing_idx) = fingerprint_index.get(&fp) {
                            let existing = &mut items[existing_idx];
                            let route = event.source.route.clone().unwrap_or_else(|| event.source.service.clone());
                            if !existing.via.contains(&route) {
                                existing.via.push(route);
                            }
                            for p in &event.provenance {
                                if !existing.provenance.contains(p) {
                                    existing.provenance.push(p.clone());
                                }
                            }
                            index.insert(event.event_id.clone(), existing_idx);
                            continue;
                        }
                        fingerprint_index.insert(fp, items.len());
                    }
                }
                index.insert(event.event_id.clone(), items.len());
                items.push(new_message_item(event));
            }
            EventPayload::Call { .. } => {
                index.insert(event.event_id.clone(), items.len());
                items.push(new_call_item(event));
            }
            EventPayload::Edit { target_event_id, patch } => {
                // Target missing (outside the query window, say) is dropped silently — not an error.
                if let Some(&idx) = index.get(target_event_id) {
                    if let Some(text) = &patch.text {
                        items[idx].text = Some(text.clone());
                    }
                }
            }
            EventPayload::Delete { target_event_id } => {
                if let Some(&idx) = index.get(target_event_id) {
                    items[idx].tombstone = Some(event.tombstone.clone().unwrap_or(Tombstone { reason: "deleted".to_owned() }));
                }
            }
            EventPayload::Reaction { target_event_id, reaction } => {
                if let Some(&idx) = index.get(target_event_id) {
                    if !items[idx].reactions.contains(reaction) {
                        items[idx].reactions.push(reaction.clone());
                    }
                }
            }
            EventPayload::Attachment { target_event_id, attachment } => {
                if let Some(&idx) = index.get(target_event_id) {
                    items[idx].attachments.push(attachment.clone());
                }
            }
            // READ_RECEIPT and MEMBERSHIP carry no transcript-item representation of
            // their own in §4.D's fold table; they exist in the store for completeness
            // (§3) but don't affect materialized output.
            EventPayload::ReadReceipt { .. } | EventPayload::Membership { .. } => {}
        }
    }

    items
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
