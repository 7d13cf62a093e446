use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::identity::handle::normalize_handle_for_matching;
use crate::model::Person;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersonRecord {
    label: String,
    handles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    vc_ids: Vec<String>,
}

/// The UTF-8 JSON people-registry file (§6): `{ "<did-or-label>": {label, handles, vc_ids?} }`.
/// Written with stable (sorted) key order via `BTreeMap` for reproducible diffs.
pub struct PeopleRegistry {
    path: PathBuf,
    records: BTreeMap<String, PersonRecord>,
}

impl PeopleRegistry {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() { BTreeMap::new() } else { serde_json::from_str(&raw)? }
        } else {
            BTreeMap::new()
        };
        Ok(PeopleRegistry { path, records })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Exact canonical-handle or case-insensitive label match (§4.B step 1).
    pub fn find_by_seed(&self, seed: &str) -> Option<Person> {
        let canonical_seed = normalize_handle_for_matching(seed);
        let lower_seed = seed.trim().to_lowercase();
        self.records.iter().find_map(|(did, rec)| {
            let matches_handle = rec.handles.iter().any(|h| *h == canonical_seed);
            let matches_label = rec.label.to_lowercase() == lower_seed;
            if matches_handle || matches_label { Some(self.to_person(did, rec)) } else { None }
        })
    }

    fn to_person(&self, did: &str, rec: &PersonRecord) -> Person {
        Person { did: did.to_owned(), label: rec.label.clone(), handles: rec.handles.clone(), vc_ids: rec.vc_ids.clone() }
    }

    /// Union-merges `handles` into the record keyed by `did_or_label`, creating it if absent.
    /// Never replaces an existing handle set — only adds (§4.B invariant: "registry writes
    /// are idempotent, union-merge, never replace").
    pub fn upsert(&mut self, did_or_label: &str, label: &str, handles: &[String]) -> Person {
        let entry = self.records.entry(did_or_label.to_owned()).or_insert_with(|| PersonRecord {
            label: label.to_owned(),
            handles: vec![],
            vc_ids: vec![],
        });
        for h in handles {
            let canonical = normalize_handle_for_matching(h);
            if !entry.handles.contains(&canonical) {
                entry.handles.push(canonical);
            }
        }
        entry.handles.sort();
        self.to_person(did_or_label, &self.records[did_or_label].clone())
    }

    pub fn all(&self) -> Vec<Person> {
        self.records.iter().map(|(did, rec)| self.to_person(did, rec)).collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_registry_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("unified-transcript-test-{}-{}", name, std::process::id()))
    }

    #[test]
    fn upsert_union_merges_handles() {
        let path = temp_registry_path("upsert");
        let _ = fs::remove_file(&path);
        let mut reg = PeopleRegistry::load(&path).unwrap();
        reg.upsert("did:person:1", "Alex", &["+14105551234".to_owned()]);
        reg.upsert("did:person:1", "Alex", &["alex@example.com".to_owned()]);
        let person = reg.find_by_seed("alex@example.com").unwrap();
        assert_eq!(person.handles.len(), 2);
        assert!(person.handles.contains(&"tel:+14105551234".to_owned()));
        assert!(person.handles.contains(&"mailto:alex@example.com".to_owned()));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn find_by_seed_matches_label_case_insensitively() {
        let path = temp_registry_path("label");
        let _ = fs::remove_file(&path);
        let mut reg = PeopleRegistry::load(&path).unwrap();
        reg.upsert("did:person:2", "Jordan", &["+14105551234".to_owned()]);
        assert!(reg.find_by_seed("JORDAN").is_some());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_and_reload_round_trips() {
        let path = temp_registry_path("roundtrip");
        let _ = fs::remove_file(&path);
        let mut reg = PeopleRegistry::load(&path).unwrap();
        reg.upsert("did:person:3", "Sam", &["+14105551234".to_owned()]);
        reg.save().unwrap();
        let reloaded = PeopleRegistry::load(&path).unwrap();
        assert_eq!(reloaded.all().len(), 1);
        let _ = fs::remove_file(&path);
    }
}
