//! View-time sanitization rules (§4.F). Applied to rendered output, never to
//! stored events.

use lazy_static::lazy_static;
use regex::Regex;

use crate::model::Attachment;

lazy_static! {
    static ref STRAY_LEADING_LETTER_REGEX: Regex = Regex::new(r"(?i)\b[a-z](https?://)").unwrap();
    static ref BROKEN_HTTPS_REGEX: Regex = Regex::new(r"(?i)\bttps://").unwrap();
    static ref URL_REGEX: Regex = Regex::new(r"(?i)https?://\S+").unwrap();
    static ref KEYING_PREFIX_REGEX: Regex =
        Regex::new(r"(?i)\b(kim\w*|ns\w*|com\.apple\.\w+(\.\w+)*|at_\d+_[0-9a-f-]+)\b").unwrap();
    static ref ARCHIVER_CLASS_NAME_REGEX: Regex =
        Regex::new(r"(?i)\b(nskeyedarchiver|nsmutablestring|nsmutabledata|nsmutableattributedstring|nsattributedstring|nsobject|nsstring|nsdictionary|nsarray)\b").unwrap();
}

const PLUGIN_PAYLOAD_SUFFIX: &str = ".pluginPayloadAttachment";

/// Strips a stray leading letter before `http(s)://`, repairs `ttps://` →
/// `https://`, and removes the trailing `WHttpURL/` sentinel.
pub fn clean_url_text(text: &str) -> String {
    let text = STRAY_LEADING_LETTER_REGEX.replace_all(text, "$1");
    let text = BROKEN_HTTPS_REGEX.replace_all(&text, "https://");
    text.replace("WHttpURL/", "")
}

pub fn contains_url(text: &str) -> bool {
    URL_REGEX.is_match(text)
}

/// Drops plugin-payload attachments when the message text already carries
/// the URL they'd redundantly preview (§4.F "Plugin-payload suppression").
pub fn hide_plugin_payload_attachments(text: Option<&str>, attachments: Vec<Attachment>) -> Vec<Attachment> {
    let has_url = text.map(contains_url).unwrap_or(false);
    if !has_url {
        return attachments;
    }
    attachments.into_iter().filter(|a| !a.name.ends_with(PLUGIN_PAYLOAD_SUFFIX)).collect()
}

/// Decodes a legacy `attributedBody` blob when `text` is null (§4.F). Grounded
/// line-for-line in `imessage_exporter/exporter.py`'s `_from_attributed`.
pub fn decode_attributed_body(raw: &[u8]) -> String {
    let lossy = String::from_utf8_lossy(raw);
    let cleaned: String = lossy.chars().filter(|&c| c != '\0' && c != '\u{fffc}').collect();
    let without_prefixes = KEYING_PREFIX_REGEX.replace_all(&cleaned, " ");

    let mut best_run = String::new();
    let mut current_run = String::new();
    let flush = |run: &mut String, best: &mut String| {
        if run.chars().count() >= 2
            && run.chars().any(|c| c.is_alphabetic())
            && !ARCHIVER_CLASS_NAME_REGEX.is_match(run)
            && run.chars().count() > best.chars().count()
        {
            *best = run.clone();
        }
        run.clear();
    };

    for c in without_prefixes.chars() {
        if c.is_control() {
            flush(&mut current_run, &mut best_run);
        } else {
            current_run.push(c);
        }
    }
    flush(&mut current_run, &mut best_run);

    best_run.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_stray_leading_letter() {
        assert_eq!(clean_url_text("ahttps://example.com"), "https://example.com");
    }

    #[test]
    fn repairs_broken_https_prefix() {
        assert_eq!(clean_url_text("ttps://example.com"), "https://example.com");
    }

    #[test]
    fn removes_trailing_sentinel() {
        assert_eq!(clean_url_text("https://example.comWHttpURL/"), "https://example.com");
    }

    #[test]
    fn plugin_payload_dropped_when_url_present() {
        let attachments = vec![
            Attachment { name: "preview.pluginPayloadAttachment".to_owned(), mime: "application/octet-stream".to_owned(), uri: "file:///a".to_owned() },
            Attachment { name: "photo.jpg".to_owned(), mime: "image/jpeg".to_owned(), uri: "file:///b".to_owned() },
        ];
        let kept = hide_plugin_payload_attachments(Some("check this out https://example.com"), attachments);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "photo.jpg");
    }

    #[test]
    fn plugin_payload_kept_without_url() {
        let attachments = vec![Attachment { name: "preview.pluginPayloadAttachment".to_owned(), mime: "application/octet-stream".to_owned(), uri: "file:///a".to_owned() }];
        let kept = hide_plugin_payload_attachments(Some("no links here"), attachments);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn decode_attributed_body_extracts_longest_printable_run() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"NSMutableAttributedString\x01");
        raw.extend_from_slice("Hello from the actual message text".as_bytes());
        raw.push(0x02);
        raw.extend_from_slice(b"kIMMessagePartAttributeName");
        let decoded = decode_attributed_body(&raw);
        assert_eq!(decoded, "Hello from the actual message text");
    }
}
