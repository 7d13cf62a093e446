//! The event sum type and the other data-model entities (§3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeMode {
    OnDevice,
    Relay,
    Direct,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    pub e2e: bool,
    pub bridge_mode: BridgeMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub service: String,
    pub id: String,
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub text: Option<String>,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageRel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub participants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    In,
    Out,
    Missed,
}

/// Variant-specific payload. The discriminant doubles as `Event::kind` (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    Message { body: MessageBody, rel: MessageRel, attachments: Vec<Attachment> },
    Edit { target_event_id: String, patch: EditPatch },
    Delete { target_event_id: String },
    Reaction { target_event_id: String, reaction: String },
    Call { direction: CallDirection, duration_ms: Option<i64> },
    Attachment { target_event_id: String, attachment: Attachment },
    ReadReceipt { target_event_id: String },
    Membership { conversation_id: String, participants: Vec<String> },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Message { .. } => "MESSAGE",
            EventPayload::Edit { .. } => "EDIT",
            EventPayload::Delete { .. } => "DELETE",
            EventPayload::Reaction { .. } => "REACTION",
            EventPayload::Call { .. } => "CALL",
            EventPayload::Attachment { .. } => "ATTACHMENT",
            EventPayload::ReadReceipt { .. } => "READ_RECEIPT",
            EventPayload::Membership { .. } => "MEMBERSHIP",
        }
    }
}

/// The atomic unit of the store (§3). Fields common to all variants, plus
/// the tagged `payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub person_did: String,
    pub source: Source,
    pub time_event: Timestamp,
    pub time_observed: Timestamp,
    pub hlc: String,
    pub security: Security,
    pub provenance: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<Tombstone>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// `target_event_id` for variants that reference another event, if any.
    pub fn target_event_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Edit { target_event_id, .. }
            | EventPayload::Delete { target_event_id }
            | EventPayload::Reaction { target_event_id, .. }
            | EventPayload::Attachment { target_event_id, .. }
            | EventPayload::ReadReceipt { target_event_id } => Some(target_event_id),
            EventPayload::Message { .. } | EventPayload::Call { .. } | EventPayload::Membership { .. } => None,
        }
    }
}

/// A counterparty identity, persisted in the people registry (§3, §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub did: String,
    pub label: String,
    pub handles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vc_ids: Vec<String>,
}

/// A logical room, identified by `conversation_id` (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub conversation_id: String,
    pub participants: Vec<String>,
}

/// One user-visible message or call, as produced by the merge engine (§4.D).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptItem {
    pub event_id: String,
    pub kind: String,
    pub time_event: Timestamp,
    pub hlc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub format: String,
    pub attachments: Vec<Attachment>,
    pub reactions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<Tombstone>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<String>,
    pub provenance: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<CallDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

/// Synthetic grouping header emitted by the conversation view (§4.D step 4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationHeader {
    pub conversation_id: String,
    pub participants: Vec<String>,
}

/// Either a real transcript item or a grouping header, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEntry {
    Header(ConversationHeader),
    Item(TranscriptItem),
}

pub type EvidenceMap = HashMap<String, usize>;
