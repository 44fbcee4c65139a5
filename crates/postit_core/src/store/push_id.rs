//! Chronologically ordered push keys.
//!
//! A push key is 20 characters: 8 encode the millisecond timestamp, 12 are
//! random. Keys sort lexicographically in creation order, including keys
//! generated within the same millisecond (the random tail is incremented
//! instead of re-rolled).

use std::sync::Mutex;
use uuid::Uuid;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Length of every generated key.
pub const PUSH_KEY_LEN: usize = TIME_CHARS + RANDOM_CHARS;

#[derive(Debug, Default)]
struct PushState {
    last_push_ms: Option<i64>,
    last_random: [u8; RANDOM_CHARS],
}

/// Push key allocator. Safe to share between tasks.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<PushState>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next key for `now_ms`.
    ///
    /// Returns `None` when no key can be produced: negative or out-of-range
    /// timestamps, an exhausted same-millisecond sequence, or a poisoned lock.
    pub fn next_key(&self, now_ms: i64) -> Option<String> {
        let time_part = encode_time(now_ms)?;
        let mut state = self.state.lock().ok()?;

        if state.last_push_ms == Some(now_ms) {
            increment_random(&mut state.last_random)?;
        } else {
            state.last_push_ms = Some(now_ms);
            state.last_random = fresh_random();
        }

        let mut key = time_part;
        key.extend(
            state
                .last_random
                .iter()
                .map(|digit| char::from(PUSH_CHARS[usize::from(*digit)])),
        );
        Some(key)
    }
}

/// Decodes the millisecond timestamp embedded in a push key.
pub fn push_key_timestamp(key: &str) -> Option<i64> {
    if key.len() != PUSH_KEY_LEN {
        return None;
    }
    key.bytes().take(TIME_CHARS).try_fold(0_i64, |acc, byte| {
        let digit = PUSH_CHARS.iter().position(|c| *c == byte)?;
        Some(acc * 64 + digit as i64)
    })
}

fn encode_time(now_ms: i64) -> Option<String> {
    if now_ms < 0 {
        return None;
    }
    let mut remaining = now_ms;
    let mut chars = [0_u8; TIME_CHARS];
    for slot in chars.iter_mut().rev() {
        *slot = PUSH_CHARS[(remaining % 64) as usize];
        remaining /= 64;
    }
    if remaining != 0 {
        return None;
    }
    Some(chars.iter().map(|c| char::from(*c)).collect())
}

fn increment_random(digits: &mut [u8; RANDOM_CHARS]) -> Option<()> {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return Some(());
        }
    }
    None
}

fn fresh_random() -> [u8; RANDOM_CHARS] {
    // Bytes 6 and 8 of a v4 uuid carry version/variant bits.
    let bytes = Uuid::new_v4().into_bytes();
    let mut digits = [0_u8; RANDOM_CHARS];
    let random_bytes = bytes
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != 6 && *idx != 8)
        .map(|(_, byte)| *byte);
    for (slot, byte) in digits.iter_mut().zip(random_bytes) {
        *slot = byte & 63;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::{push_key_timestamp, PushIdGenerator, PUSH_KEY_LEN};
    use crate::store::key::validate_key;

    #[test]
    fn keys_are_valid_and_embed_timestamp() {
        let generator = PushIdGenerator::new();
        let key = generator.next_key(1_700_000_000_000).expect("key");
        assert_eq!(key.len(), PUSH_KEY_LEN);
        assert!(validate_key(&key).is_ok());
        assert_eq!(push_key_timestamp(&key), Some(1_700_000_000_000));
    }

    #[test]
    fn keys_sort_in_creation_order() {
        let generator = PushIdGenerator::new();
        let mut keys = Vec::new();
        for ms in [100, 100, 100, 101, 5_000, 5_000] {
            keys.push(generator.next_key(ms).expect("key"));
        }
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), keys.len());
    }

    #[test]
    fn rejects_negative_and_overflowing_time() {
        let generator = PushIdGenerator::new();
        assert!(generator.next_key(-1).is_none());
        assert!(generator.next_key(i64::MAX).is_none());
    }

    #[test]
    fn timestamp_decoding_rejects_foreign_keys() {
        assert_eq!(push_key_timestamp("short"), None);
        assert_eq!(push_key_timestamp("!!!!!!!!aaaaaaaaaaaa"), None);
    }
}
