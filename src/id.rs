//! 24-character record id generator.
//!
//! Layout: 8 hex chars of the low 32 bits of a millisecond epoch timestamp,
//! 8 hex chars of a stable hash of the caller's prefix seed, 8 hex chars
//! combining a 24-bit monotonic counter with 8 random bits.

use crate::util::{from_hex_be, to_hex_be};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generates 24-character record ids; carries a process-local monotonic
/// counter so same-millisecond calls still order.
pub struct IdGenerator {
    counter: AtomicU32,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Construct a generator with a fresh, zeroed counter.
    pub fn new() -> Self {
        IdGenerator {
            counter: AtomicU32::new(0),
        }
    }

    /// Produce a new 24-character id. `prefix_seed` is hashed into the
    /// middle 8 characters (e.g. a table name), so ids from different
    /// tables look visibly distinct even when generated in the same
    /// millisecond.
    pub fn unique_id(&self, prefix_seed: &[u8]) -> String {
        let now_ms = now_millis();
        let ts = to_hex_be(now_ms & 0xffff_ffff, 4);

        let mut hasher = FxHasher::default();
        prefix_seed.hash(&mut hasher);
        let prefix = to_hex_be(hasher.finish() & 0xffff_ffff, 4);

        // 24-bit monotonic counter, low 8 bits of a random byte.
        let count = self.counter.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
        let rand_byte = rand::random::<u8>() as u32;
        let suffix_val = (count << 8) | rand_byte;
        let suffix = to_hex_be(suffix_val as u64, 4);

        let mut id = String::with_capacity(24);
        id.push_str(&ts);
        id.push_str(&prefix);
        id.push_str(&suffix);
        id
    }

    /// Recover the millisecond timestamp (low 32 bits) embedded in `id`.
    /// Returns `None` if `id` is not 24 hex-like characters.
    pub fn unique_id_date(id: &str) -> Option<i64> {
        if id.len() != 24 || !id.is_ascii() {
            return None;
        }
        Some(from_hex_be(&id.as_bytes()[0..8], 4) as i64)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_24_chars_and_unique() {
        let gen = IdGenerator::new();
        let a = gen.unique_id(b"users");
        let b = gen.unique_id(b"users");
        assert_eq!(a.len(), 24);
        assert_eq!(b.len(), 24);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn date_round_trips() {
        let gen = IdGenerator::new();
        let before = now_millis() as i64 & 0xffff_ffff;
        let id = gen.unique_id(b"t");
        let recovered = IdGenerator::unique_id_date(&id).unwrap();
        assert!((recovered - before).abs() < 5_000);
    }

    #[test]
    fn rejects_malformed_id() {
        assert_eq!(IdGenerator::unique_id_date("short"), None);
    }
}
