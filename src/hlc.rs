//! Hybrid logical clock: generation, parsing, comparison, merge (§4.A).

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::Result;

/// `(wall_ms, counter, node_id)`. Encodes to/from `"wall_ms:counter:node_id"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hlc {
    pub wall_ms: i64,
    pub counter: u32,
    pub node_id: String,
}

impl Hlc {
    pub fn new(node_id: impl Into<String>) -> Self {
        Hlc { wall_ms: 0, counter: 0, node_id: node_id.into() }
    }

    /// 8 hex-digit random node id, used when the caller doesn't supply one via `UnifyContext`.
    pub fn random_node_id() -> String {
        let mut rng = SmallRng::from_entropy();
        format!("{:08x}", rng.gen::<u32>())
    }

    fn current_wall_ms() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
    }

    /// Advances the clock for a new local event and returns its encoded HLC string.
    pub fn now(&mut self) -> String {
        let cur = Self::current_wall_ms();
        if cur > self.wall_ms {
            self.wall_ms = cur;
            self.counter = 0;
        } else {
            self.counter += 1;
        }
        self.encode()
    }

    /// Merges in a remote HLC string, advancing the local clock past both.
    pub fn merge(&mut self, remote: &str) -> Result<String> {
        let (rw, rc, _) = Self::decode_parts(remote)?;
        let new_wall = self.wall_ms.max(rw);
        self.counter = if self.wall_ms == rw {
            self.counter.max(rc) + 1
        } else if new_wall == self.wall_ms {
            self.counter + 1
        } else {
            rc + 1
        };
        self.wall_ms = new_wall;
        Ok(self.encode())
    }

    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.wall_ms, self.counter, self.node_id)
    }

    fn decode_parts(s: &str) -> Result<(i64, u32, String)> {
        let mut parts = s.splitn(3, ':');
        let wall = parts.next().and_then(|p| p.parse::<i64>().ok());
        let counter = parts.next().and_then(|p| p.parse::<u32>().ok());
        let node = parts.next();
        match (wall, counter, node) {
            (Some(w), Some(c), Some(n)) => Ok((w, c, n.to_owned())),
            // Malformed HLC falls back to (0, 0) per §4.D "Failure semantics".
            _ => Ok((0, 0, String::new())),
        }
    }

    /// Sort key for an HLC string: `(wall, counter)`. Malformed strings sort as `(0, 0)`.
    pub fn sort_key(s: &str) -> (i64, u32) {
        let (w, c, _) = Self::decode_parts(s).unwrap_or((0, 0, String::new()));
        (w, c)
    }

    pub fn compare(a: &str, b: &str) -> Ordering {
        Self::sort_key(a).cmp(&Self::sort_key(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_strictly_increasing() {
        let mut clock = Hlc::new("node-a");
        let mut prev = clock.now();
        for _ in 0..50 {
            let next = clock.now();
            assert_eq!(Hlc::compare(&prev, &next), Ordering::Less);
            prev = next;
        }
    }

    #[test]
    fn merge_exceeds_both_inputs() {
        let mut local = Hlc::new("node-a");
        let local_before = local.now();
        let remote = format!("{}:3:node-b", local.wall_ms);
        let merged = local.merge(&remote).unwrap();
        assert_eq!(Hlc::compare(&local_before, &merged), Ordering::Less);
        assert_eq!(Hlc::compare(&remote, &merged), Ordering::Less);
    }

    #[test]
    fn compare_is_lexical_on_tuple() {
        assert_eq!(Hlc::compare("100:0:a", "100:1:a"), Ordering::Less);
        assert_eq!(Hlc::compare("99:9:a", "100:0:a"), Ordering::Less);
        assert_eq!(Hlc::compare("malformed", "100:0:a"), Ordering::Less);
    }
}
