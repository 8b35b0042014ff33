use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, distributions::Alphanumeric};

/// Milliseconds since the UNIX epoch, `0` if the clock is before it.
#[must_use]
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Same as [`now_millis`], narrowed for the wire (`u64` covers ~584M years).
#[must_use]
pub fn now_unix_ms() -> u64 {
    u64::try_from(now_millis()).unwrap_or(u64::MAX)
}

/// Random alphanumeric token of `len` characters.
#[must_use]
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_requested_length_and_charset() {
        let t = random_token(21);
        assert_eq!(t.len(), 21);
        assert!(t.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_differ() {
        assert_ne!(random_token(21), random_token(21));
    }

    #[test]
    fn clock_is_after_2020() {
        assert!(now_unix_ms() > 1_577_836_800_000);
    }
}
