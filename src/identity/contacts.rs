//! External contact sources consulted during handle expansion (§4.B step 2).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::identity::handle::normalize_handle_for_matching;
use crate::Result;

/// display name -> canonical handles, as loaded from one external source.
pub type ContactsMap = HashMap<String, Vec<String>>;

/// Minimal vCard scanner: reads `TEL`/`EMAIL` lines under each `FN`, grouping
/// by display name. Doesn't attempt full RFC 6350 parsing (folded lines,
/// parameters beyond `TYPE=`) — only what the ingestion boundary needs.
pub fn load_vcf(path: &Path) -> Result<ContactsMap> {
    let content = fs::read_to_string(path)?;
    let mut result: ContactsMap = HashMap::new();
    let mut current_name: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("BEGIN:VCARD") {
            let _ = rest;
            current_name = None;
        } else if let Some(name) = line.strip_prefix("FN:") {
            current_name = Some(name.trim().to_owned());
        } else if let Some(name) = current_name.clone() {
            if let Some(value) = value_after_field(line, "TEL") {
                result.entry(name).or_default().push(normalize_handle_for_matching(&value));
            } else if let Some(value) = value_after_field(line, "EMAIL") {
                result.entry(name).or_default().push(normalize_handle_for_matching(&value));
            }
        }
    }
    Ok(result)
}

/// `TEL;TYPE=CELL:+14105551234` / `EMAIL:person@example.com` — field name may
/// carry `;`-separated parameters before the `:` value.
fn value_after_field(line: &str, field: &str) -> Option<String> {
    let (name_part, value) = line.split_once(':')?;
    let bare_name = name_part.split(';').next().unwrap_or(name_part);
    if bare_name.eq_ignore_ascii_case(field) {
        Some(value.trim().to_owned())
    } else {
        None
    }
}

/// `name,handle` CSV loader, grounded in `identity/contacts.py`'s `load_csv`.
pub fn load_csv(path: &Path) -> Result<ContactsMap> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut result: ContactsMap = HashMap::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < 2 {
            continue;
        }
        let name = record[0].trim().to_owned();
        let handle = normalize_handle_for_matching(record[1].trim());
        result.entry(name).or_default().push(handle);
    }
    Ok(result)
}

/// Optional macOS Contacts lookup (§4.B step 3). The concrete implementation
/// is an external collaborator (§1 Non-goals); this crate only defines the
/// seam, following the teacher's `MyselfChooser`/`NoChooser` pattern for an
/// intentionally unimplemented interactive dependency.
pub trait ContactsLookup {
    fn lookup(&self, seed: &str) -> Option<(String, Vec<String>)>;
}

pub struct NoContactsLookup;

impl ContactsLookup for NoContactsLookup {
    fn lookup(&self, _seed: &str) -> Option<(String, Vec<String>)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn vcf_groups_handles_by_display_name() {
        let mut path = std::env::temp_dir();
        path.push(format!("unified-transcript-test-vcf-{}.vcf", std::process::id()));
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "BEGIN:VCARD").unwrap();
        writeln!(f, "FN:Alex Rivera").unwrap();
        writeln!(f, "TEL;TYPE=CELL:+1 (410) 925-6693").unwrap();
        writeln!(f, "EMAIL:alex@example.com").unwrap();
        writeln!(f, "END:VCARD").unwrap();
        let map = load_vcf(&path).unwrap();
        let handles = &map["Alex Rivera"];
        assert!(handles.contains(&"tel:+14109256693".to_owned()));
        assert!(handles.contains(&"mailto:alex@example.com".to_owned()));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn csv_maps_name_to_handle() {
        let mut path = std::env::temp_dir();
        path.push(format!("unified-transcript-test-csv-{}.csv", std::process::id()));
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "name,handle").unwrap();
        writeln!(f, "Jordan Lee,+14105551234").unwrap();
        let map = load_csv(&path).unwrap();
        assert_eq!(map["Jordan Lee"], vec!["tel:+14105551234".to_owned()]);
        let _ = fs::remove_file(&path);
    }
}
