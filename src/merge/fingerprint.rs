//! Via-collapse fingerprinting (§4.D step 3, §4.E step 6).

use std::hash::{BuildHasher, BuildHasherDefault, Hasher};

use hashers::fx_hash::FxHasher;

use crate::time::Timestamp;

const TIME_BUCKET_SECONDS: i64 = 120;

/// `H(normalized_text | time_rounded_to_120s | canonical_sender)`.
///
/// Uses the same fast non-cryptographic hash the teacher's `loader.rs`
/// (`hash_to_id`) uses for its own dedup ids — this fingerprint only needs
/// to disambiguate within one in-memory merge pass, not survive across
/// processes or resist adversarial collisions.
pub fn via_collapse_fingerprint(text: &str, time_event: &Timestamp, canonical_sender: &str) -> u64 {
    let normalized_text = normalize_for_fingerprint(text);
    let bucket = time_event.timestamp() / TIME_BUCKET_SECONDS;
    let key = format!("{}|{}|{}", normalized_text, bucket, canonical_sender);

    let hasher_builder: BuildHasherDefault<FxHasher> = BuildHasherDefault::default();
    let mut h = hasher_builder.build_hasher();
    h.write(key.as_bytes());
    h.write_u8(0xff);
    h.finish()
}

fn normalize_for_fingerprint(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;

    fn ts(unix_seconds: i64) -> Timestamp {
        Timestamp(Local.timestamp_opt(unix_seconds, 0).unwrap())
    }

    #[test]
    fn same_text_and_bucket_collide() {
        let a = via_collapse_fingerprint("Hello", &ts(1_000_000), "+14105551234");
        let b = via_collapse_fingerprint("  hello  ", &ts(1_000_030), "+14105551234");
        assert_eq!(a, b);
    }

    #[test]
    fn different_sender_does_not_collide() {
        let a = via_collapse_fingerprint("Hello", &ts(1_000_000), "+14105551234");
        let b = via_collapse_fingerprint("Hello", &ts(1_000_000), "+19995551234");
        assert_ne!(a, b);
    }

    #[test]
    fn far_apart_buckets_do_not_collide() {
        let a = via_collapse_fingerprint("Hello", &ts(1_000_000), "+14105551234");
        let b = via_collapse_fingerprint("Hello", &ts(1_000_500), "+14105551234");
        assert_ne!(a, b);
    }
}
