//! `expand_handles(seed)` — §4.B handle expansion.

use crate::identity::contacts::{ContactsLookup, ContactsMap};
use crate::identity::handle::normalize_handle_for_matching;
use crate::identity::registry::PeopleRegistry;
use crate::model::Person;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    PeopleJson,
    Contacts,
    Macos,
    Seed,
}

#[derive(Debug, Clone)]
pub struct ExpandedHandles {
    pub display_name: String,
    pub handles: Vec<String>,
    pub origin: Origin,
}

/// Resolution order per §4.B: people registry, then external contact sources,
/// then platform contacts, then fall back to the seed alone. Every step that
/// finds a match persists the result into the registry (idempotent union-merge).
pub fn expand_handles(
    seed: &str,
    registry: &mut PeopleRegistry,
    external_sources: &[ContactsMap],
    contacts_lookup: &dyn ContactsLookup,
) -> ExpandedHandles {
    if let Some(person) = registry.find_by_seed(seed) {
        return ExpandedHandles { display_name: person.label, handles: sorted(person.handles), origin: Origin::PeopleJson };
    }

    let canonical_seed = normalize_handle_for_matching(seed);
    for source in external_sources {
        if let Some((display_name, handles)) = match_in_source(source, &canonical_seed) {
            let person = registry.upsert(&display_name, &display_name, &handles);
            return ExpandedHandles { display_name: person.label, handles: sorted(person.handles), origin: Origin::Contacts };
        }
    }

    if let Some((display_name, handles)) = contacts_lookup.lookup(seed) {
        let person = registry.upsert(&display_name, &display_name, &handles);
        return ExpandedHandles { display_name: person.label, handles: sorted(person.handles), origin: Origin::Macos };
    }

    let person = registry.upsert(seed, seed, &[seed.to_owned()]);
    ExpandedHandles { display_name: person.label, handles: sorted(person.handles), origin: Origin::Seed }
}

fn match_in_source(source: &ContactsMap, canonical_seed: &str) -> Option<(String, Vec<String>)> {
    source.iter().find_map(|(display_name, handles)| {
        let matches = handles.iter().any(|h| normalize_handle_for_matching(h) == canonical_seed);
        if matches { Some((display_name.clone(), handles.clone())) } else { None }
    })
}

fn sorted(mut handles: Vec<String>) -> Vec<String> {
    handles.sort();
    handles.dedup();
    handles
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::identity::contacts::NoContactsLookup;

    fn temp_registry_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("unified-transcript-test-expand-{}-{}", name, std::process::id()))
    }

    #[test]
    fn falls_back_to_seed_when_unknown() {
        let path = temp_registry_path("fallback");
        let _ = fs::remove_file(&path);
        let mut reg = PeopleRegistry::load(&path).unwrap();
        let expanded = expand_handles("+14105551234", &mut reg, &[], &NoContactsLookup);
        assert_eq!(expanded.origin, Origin::Seed);
        assert_eq!(expanded.handles, vec!["tel:+14105551234".to_owned()]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn matches_external_contacts_source_and_persists() {
        let path = temp_registry_path("contacts");
        let _ = fs::remove_file(&path);
        let mut reg = PeopleRegistry::load(&path).unwrap();
        let mut source: ContactsMap = HashMap::new();
        source.insert("Alex Rivera".to_owned(), vec!["+14105551234".to_owned(), "alex@example.com".to_owned()]);
        let expanded = expand_handles("+14105551234", &mut reg, &[source], &NoContactsLookup);
        assert_eq!(expanded.origin, Origin::Contacts);
        assert_eq!(expanded.handles.len(), 2);
        // Second call hits the now-persisted registry record.
        let expanded_again = expand_handles("alex@example.com", &mut reg, &[], &NoContactsLookup);
        assert_eq!(expanded_again.origin, Origin::PeopleJson);
        let _ = fs::remove_file(&path);
    }
}
