//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] wrappers. The relay producer key and any
//! credential-bearing configuration value should be held as a
//! [`SecretString`] so that `Debug` output and tracing fields show
//! `[REDACTED]` instead of the value.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let key = SecretString::from("relay-key");
//! assert!(!format!("{key:?}").contains("relay-key"));
//! assert_eq!(key.expose_secret(), "relay-key");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

/// Compare a presented value with a secret without short-circuiting on the
/// first differing byte.
#[must_use]
pub fn matches_secret(secret: &SecretString, presented: &str) -> bool {
    let expected = secret.expose_secret().as_bytes();
    let presented = presented.as_bytes();
    if expected.len() != presented.len() {
        return false;
    }
    expected
        .iter()
        .zip(presented)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("changeme");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("changeme"));
    }

    #[test]
    fn test_matches_secret() {
        let secret = SecretString::from("relay-key-1");

        assert!(matches_secret(&secret, "relay-key-1"));
        assert!(!matches_secret(&secret, "relay-key-2"));
        assert!(!matches_secret(&secret, "relay-key"));
        assert!(!matches_secret(&secret, ""));
    }
}
