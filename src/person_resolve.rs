//! Person resolution by evidence counting (§4.B "Person resolution").

use std::collections::HashMap;

use crate::identity::handle::normalize_handle_for_matching;
use crate::model::{Event, EventPayload, EvidenceMap};
use crate::Result;

pub enum PersonResolution {
    Resolved(String),
    Ambiguous(EvidenceMap),
}

/// Counts MESSAGE events whose sender or participant (canonicalized) matches
/// any of `handle_variants`, grouped by `event.person_did`. Exactly one
/// candidate with positive evidence resolves; zero or more than one is
/// ambiguous (§7 `AmbiguousPerson` — non-fatal, evidence surfaced to caller).
pub fn resolve_person<'a>(events: impl IntoIterator<Item = &'a Event>, handle_variants: &[String]) -> PersonResolution {
    let canonical_variants: Vec<String> = handle_variants.iter().map(|h| normalize_handle_for_matching(h)).collect();
    let mut evidence: EvidenceMap = HashMap::new();

    for event in events {
        let EventPayload::Message { rel, .. } = &event.payload else { continue };
        let sender_matches = canonical_variants.contains(&normalize_handle_for_matching(&event.source.sender));
        let participant_matches = rel.participants.iter().any(|p| canonical_variants.contains(&normalize_handle_for_matching(p)));
        if sender_matches || participant_matches {
            *evidence.entry(event.person_did.clone()).or_insert(0) += 1;
        }
    }

    let positive: Vec<&String> = evidence.iter().filter(|(_, &count)| count > 0).map(|(did, _)| did).collect();
    match positive.as_slice() {
        [only] => PersonResolution::Resolved((*only).clone()),
        _ => PersonResolution::Ambiguous(evidence),
    }
}

pub fn require_resolved(resolution: PersonResolution) -> Result<String> {
    match resolution {
        PersonResolution::Resolved(did) => Ok(did),
        PersonResolution::Ambiguous(evidence) => {
            crate::err!("Ambiguous person: {} candidate(s) with evidence {:?}", evidence.len(), evidence)
        }
    }
}
