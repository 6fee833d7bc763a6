//! Content and scene-key digests.
//!
//! Revision identity is the SHA-256 of the raw upload bytes; scene keys
//! are short digests of a scene's heading fingerprint plus its ordinal
//! among scenes sharing that fingerprint, so keys survive insertion and
//! deletion of unrelated scenes.

use sha2::{Digest, Sha256};

/// Length of a scene key in hex characters (64 bits of the digest).
pub const SCENE_KEY_LEN: usize = 16;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Derive a stable scene key from a heading fingerprint.
///
/// The fingerprint is the scene's (interior/exterior token, normalized
/// location, time-of-day token); `ordinal` is the zero-based position of
/// this scene among scenes with the same fingerprint, in document order.
/// Two untouched scenes therefore keep their keys when an unrelated
/// scene is inserted or removed between them.
pub fn scene_key(fingerprint: &str, ordinal: u32) -> String {
    let digest = sha256_hex(format!("{fingerprint}\u{1f}{ordinal}").as_bytes());
    digest[..SCENE_KEY_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- sha256_hex ------------------------------------------------------

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn consistent_output() {
        let data = b"INT. KITCHEN - DAY";
        assert_eq!(sha256_hex(data), sha256_hex(data));
        assert_eq!(sha256_hex(data).len(), 64);
    }

    // -- scene_key -------------------------------------------------------

    #[test]
    fn scene_key_is_deterministic() {
        assert_eq!(scene_key("INT|KITCHEN|day", 0), scene_key("INT|KITCHEN|day", 0));
        assert_eq!(scene_key("INT|KITCHEN|day", 0).len(), SCENE_KEY_LEN);
    }

    #[test]
    fn scene_key_varies_with_ordinal() {
        assert_ne!(scene_key("INT|KITCHEN|day", 0), scene_key("INT|KITCHEN|day", 1));
    }

    #[test]
    fn scene_key_varies_with_fingerprint() {
        assert_ne!(scene_key("INT|KITCHEN|day", 0), scene_key("EXT|STREET|night", 0));
    }
}
