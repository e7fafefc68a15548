//! Random key generation for short URLs and user ids

use rand::Rng;

/// Default length of a generated short URL key
pub const DEFAULT_KEY_LENGTH: usize = 6;

/// Generates a random key of `len` characters drawn from `[0-9A-Za-z]`.
///
/// Bytes are sampled uniformly from `48..=122` (`'0'..='z'`) and anything that
/// lands between the digits and the uppercase letters, or between the uppercase
/// and lowercase letters, is thrown away and drawn again.
pub fn random_key(len: usize) -> String {
    let mut rng = rand::rng();
    let mut key = String::with_capacity(len);

    while key.len() < len {
        let code: u8 = rng.random_range(48..=122);
        if matches!(code, b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z') {
            key.push(char::from(code));
        }
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_length_keys_are_six_alphanumerics() {
        for _ in 0..500 {
            let key = random_key(DEFAULT_KEY_LENGTH);
            assert_eq!(key.len(), 6);
            assert!(key.bytes().all(|b| b.is_ascii_alphanumeric()), "bad key {key}");
        }
    }

    #[test]
    fn honours_requested_length() {
        assert_eq!(random_key(0), "");
        assert_eq!(random_key(1).len(), 1);
        assert_eq!(random_key(32).len(), 32);
    }

    #[test]
    fn never_emits_gap_characters() {
        let sample: String = (0..200).map(|_| random_key(16)).collect();
        for gap in [':', ';', '<', '=', '>', '?', '@', '[', '\\', ']', '^', '_', '`'] {
            assert!(!sample.contains(gap), "found {gap:?}");
        }
    }
}
