use std::collections::BTreeMap;

use itertools::Itertools;

use crate::merge::materialize;
use crate::model::{ConversationHeader, Event, TranscriptItem, ViewEntry};
use crate::sanitize::hide_plugin_payload_attachments;

/// Resolves a raw sender handle to a display name, for participant lines and
/// per-item rendering. Defaults to the identity function when the caller
/// doesn't supply one (no people registry available).
pub type ResolveDisplay<'a> = dyn Fn(&str) -> String + 'a;

pub struct ConversationOptions<'a> {
    pub group_by_conversation: bool,
    pub via_collapse: bool,
    pub hide_plugin_payload: bool,
    pub resolve_display: Option<&'a ResolveDisplay<'a>>,
}

impl<'a> Default for ConversationOptions<'a> {
    fn default() -> Self {
        ConversationOptions { group_by_conversation: true, via_collapse: true, hide_plugin_payload: true, resolve_display: None }
    }
}

fn display_name(options: &ConversationOptions, sender: &str) -> String {
    options.resolve_display.map(|f| f(sender)).unwrap_or_else(|| sender.to_owned())
}

/// Produces the conversation view (§4.D steps 1-5): sort, fold, optional
/// via-collapse, optional grouping into per-room sections with a synthetic
/// `header` item, optional plugin-payload attachment suppression.
pub fn get_conversation(events: impl IntoIterator<Item = Event>, options: &ConversationOptions) -> Vec<ViewEntry> {
    let mut items = materialize(events, options.via_collapse);

    if options.hide_plugin_payload {
        for item in &mut items {
            let attachments = std::mem::take(&mut item.attachments);
            item.attachments = hide_plugin_payload_attachments(item.text.as_deref(), attachments);
        }
    }

    if !options.group_by_conversation {
        return items.into_iter().map(ViewEntry::Item).collect();
    }

    // Group, preserving each group's internal merge order; groups themselves
    // are emitted in ascending order of their first item's time_event.
    let mut groups: BTreeMap<Option<String>, Vec<TranscriptItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.conversation_id.clone()).or_default().push(item);
    }

    let mut grouped: Vec<(Option<String>, Vec<TranscriptItem>)> = groups.into_iter().collect();
    grouped.sort_by_key(|(_, items)| items.first().map(|i| i.time_event));

    let mut result = Vec::new();
    for (conversation_id, group_items) in grouped {
        if let Some(conversation_id) = &conversation_id {
            let participants = group_items.iter().map(|i| display_name(options, &i.sender)).unique().sorted().collect();
            result.push(ViewEntry::Header(ConversationHeader { conversation_id: conversation_id.clone(), participants }));
        }
        result.extend(group_items.into_iter().map(ViewEntry::Item));
    }
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub conversation_id: String,
    pub participants: Vec<String>,
    pub message_count: usize,
}

/// `--list-chats`-equivalent summary (re-expressed as a library call; the CLI
/// surface itself is out of scope per spec.md §1).
pub fn list_chats(events: impl IntoIterator<Item = Event>, options: &ConversationOptions) -> Vec<ChatSummary> {
    let items = materialize(events, options.via_collapse);
    let mut by_conversation: BTreeMap<String, Vec<&TranscriptItem>> = BTreeMap::new();
    for item in &items {
        if let Some(conversation_id) = &item.conversation_id {
            by_conversation.entry(conversation_id.clone()).or_default().push(item);
        }
    }
    by_conversation
        .into_iter()
        .map(|(conversation_id, group)| ChatSummary {
            conversation_id,
            participants: group.iter().map(|i| display_name(options, &i.sender)).unique().sorted().collect(),
            message_count: group.len(),
        })
        .collect()
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
