use std::collections::BTreeMap;

use itertools::Itertools;

use crate::identity::expand::ExpandedHandles;
use crate::identity::handle::normalize_handle_for_matching;
use crate::merge::materialize;
use crate::model::{Event, TranscriptItem};
use crate::sanitize::{clean_url_text, hide_plugin_payload_attachments};

pub type ResolveDisplay<'a> = dyn Fn(&str) -> String + 'a;

pub struct VoiceOptions<'a> {
    /// Lines of context kept on either side of each authored utterance.
    pub context: usize,
    pub quotes_only: bool,
    pub via_collapse: bool,
    pub hide_plugin_payload: bool,
    pub resolve_display: Option<&'a ResolveDisplay<'a>>,
}

impl<'a> Default for VoiceOptions<'a> {
    fn default() -> Self {
        VoiceOptions { context: 2, quotes_only: false, via_collapse: true, hide_plugin_payload: true, resolve_display: None }
    }
}

fn display_name(options: &VoiceOptions, sender: &str) -> String {
    options.resolve_display.map(|f| f(sender)).unwrap_or_else(|| sender.to_owned())
}

/// Union of index windows `[max(0,i-context), min(len-1,i+context)]` for each
/// authored index, merging ranges whose gap is at most 1 (§4.E step 5).
fn context_windows(authored_idx: &[usize], len: usize, context: usize) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = authored_idx
        .iter()
        .map(|&i| (i.saturating_sub(context), (i + context).min(len.saturating_sub(1))))
        .collect();
    ranges.sort();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in ranges {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 + 1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

fn render_line(options: &VoiceOptions, item: &TranscriptItem, authored: bool) -> String {
    let who = display_name(options, &item.sender);
    let ts = item.time_event.format("%Y-%m-%d %H:%M").to_string();
    let attachments = if options.hide_plugin_payload {
        hide_plugin_payload_attachments(item.text.as_deref(), item.attachments.clone())
    } else {
        item.attachments.clone()
    };
    let attachments_suffix =
        if attachments.is_empty() { String::new() } else { format!(" [{}]", attachments.iter().map(|a| a.name.as_str()).join(", ")) };
    let via_suffix = if item.via.is_empty() { String::new() } else { format!(" (via {})", item.via.join(", ")) };
    let text = item.text.as_deref().map(clean_url_text).unwrap_or_default();

    let body = format!("{ts} — {who}: {text}{attachments_suffix}{via_suffix}");
    if authored { format!("**{body}**") } else { body }
}

/// Produces the voice manuscript for one counterparty (§4.E): every
/// utterance they authored across all rooms, with configurable surrounding
/// context, rendered as Markdown-ish text with a top banner and per-room
/// headers.
pub fn render_voice_manuscript(events: impl IntoIterator<Item = Event>, expanded: &ExpandedHandles, options: &VoiceOptions) -> String {
    let handle_set: std::collections::HashSet<String> = expanded.handles.iter().cloned().collect();

    let items = materialize(events, options.via_collapse);
    let mut buckets: BTreeMap<String, Vec<TranscriptItem>> = BTreeMap::new();
    for item in items {
        if item.kind != "MESSAGE" {
            continue;
        }
        if let Some(conversation_id) = item.conversation_id.clone() {
            buckets.entry(conversation_id).or_default().push(item);
        }
    }

    struct RenderedBucket {
        first_time: Option<crate::time::Timestamp>,
        body: String,
    }

    let mut rendered_buckets: Vec<RenderedBucket> = Vec::new();
    let mut overall_min_time = None;
    let mut overall_max_time = None;

    for (conversation_id, bucket_items) in buckets {
        let authored_idx: Vec<usize> = bucket_items
            .iter()
            .enumerate()
            .filter(|(_, item)| handle_set.contains(&normalize_handle_for_matching(&item.sender)))
            .map(|(i, _)| i)
            .collect();
        if authored_idx.is_empty() {
            continue;
        }

        let kept_indices: Vec<usize> = if options.quotes_only {
            authored_idx.clone()
        } else {
            context_windows(&authored_idx, bucket_items.len(), options.context)
                .into_iter()
                .flat_map(|(start, end)| start..=end)
                .collect()
        };

        let authored_set: std::collections::HashSet<usize> = authored_idx.into_iter().collect();
        let lines: Vec<String> =
            kept_indices.iter().map(|&idx| render_line(options, &bucket_items[idx], authored_set.contains(&idx))).collect();

        let first_time = kept_indices.first().map(|&idx| bucket_items[idx].time_event);
        if let Some(t) = first_time {
            overall_min_time = Some(overall_min_time.map_or(t, |m: crate::time::Timestamp| m.min(t)));
            overall_max_time = Some(overall_max_time.map_or(t, |m: crate::time::Timestamp| m.max(t)));
        }

        let participants: Vec<String> =
            kept_indices.iter().map(|&idx| display_name(options, &bucket_items[idx].sender)).unique().sorted().collect();

        let header = format!("## Room: {conversation_id}\nParticipants: {}", participants.join(", "));
        let body = format!("{header}\n{}", lines.join("\n"));

        rendered_buckets.push(RenderedBucket { first_time, body });
    }

    rendered_buckets.sort_by_key(|b| b.first_time);

    let handle_list = expanded.handles.join(", ");
    let date_range = match (overall_min_time, overall_max_time) {
        (Some(min), Some(max)) => format!("{} to {}", min.format("%Y-%m-%d"), max.format("%Y-%m-%d")),
        _ => "(no messages)".to_owned(),
    };
    let banner = format!("# Voice manuscript: {}\nHandles: {}\nDate range: {}\n", expanded.display_name, handle_list, date_range);

    let sections: Vec<String> = rendered_buckets.into_iter().map(|b| b.body).collect();
    format!("{banner}\n{}", sections.join("\n\n"))
}

#[cfg(test)]
#[path = "voice_tests.rs"]
mod tests;
