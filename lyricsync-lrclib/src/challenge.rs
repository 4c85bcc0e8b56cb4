//! Proof-of-work for LRCLIB publish tokens.
//!
//! The server hands out a `prefix` and a hex `target`; a nonce is accepted
//! when `SHA-256(prefix ++ nonce)` compares bytewise less than or equal to
//! the decoded target.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a SHA-256 digest, and so of a valid decoded target
const TARGET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("target is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("target decodes to {0} bytes, expected 32")]
    TargetLength(usize),
}

/// Challenge returned by `POST /request-challenge`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Challenge {
    pub prefix: String,
    pub target: String,
}

impl Challenge {
    /// Value for the `X-Publish-Token` header once solved
    #[must_use]
    pub fn publish_token(&self, nonce: &str) -> String {
        format!("{}:{}", self.prefix, nonce)
    }
}

/// Find the first decimal nonce that satisfies the challenge.
///
/// CPU bound; run it off the async runtime.
///
/// # Errors
///
/// Returns an error if the target is not valid hex or is not a full
/// 32-byte value. A shorter target could never be met.
pub fn solve(challenge: &Challenge) -> Result<String, ChallengeError> {
    let target = hex::decode(&challenge.target)?;
    if target.len() != TARGET_LEN {
        return Err(ChallengeError::TargetLength(target.len()));
    }

    let mut nonce: u64 = 0;
    loop {
        let candidate = nonce.to_string();
        if meets_target(&digest(&challenge.prefix, &candidate), &target) {
            return Ok(candidate);
        }
        nonce = nonce.wrapping_add(1);
    }
}

fn digest(prefix: &str, nonce: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(nonce.as_bytes());
    hasher.finalize().into()
}

fn meets_target(hash: &[u8], target: &[u8]) -> bool {
    hash <= target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(target: &str) -> Challenge {
        Challenge {
            prefix: "VXMwW2qPfW2gkCNSl1i708NJkDghtAyU".to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn test_max_target_accepts_first_nonce() {
        let c = challenge(&"f".repeat(64));
        assert_eq!(solve(&c).unwrap(), "0");
    }

    #[test]
    fn test_solution_meets_target() {
        let target = format!("00{}", "f".repeat(62));
        let c = challenge(&target);
        let nonce = solve(&c).unwrap();

        let hash = digest(&c.prefix, &nonce);
        assert_eq!(hash[0], 0);
        assert!(meets_target(&hash, &hex::decode(&target).unwrap()));
    }

    #[test]
    fn test_meets_target_is_bytewise() {
        assert!(meets_target(&[0x00, 0xff], &[0x01, 0x00]));
        assert!(meets_target(&[0x01, 0x00], &[0x01, 0x00]));
        assert!(!meets_target(&[0x01, 0x01], &[0x01, 0x00]));
    }

    #[test]
    fn test_invalid_target() {
        assert!(matches!(
            solve(&challenge("not hex")),
            Err(ChallengeError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_short_target_is_rejected() {
        assert!(matches!(
            solve(&challenge("00")),
            Err(ChallengeError::TargetLength(1))
        ));
        assert!(matches!(
            solve(&challenge("")),
            Err(ChallengeError::TargetLength(0))
        ));
        assert!(matches!(
            solve(&challenge(&"f".repeat(66))),
            Err(ChallengeError::TargetLength(33))
        ));
    }

    #[test]
    fn test_publish_token() {
        let c = challenge("00");
        assert_eq!(
            c.publish_token("1234"),
            "VXMwW2qPfW2gkCNSl1i708NJkDghtAyU:1234"
        );
    }

    #[test]
    fn test_challenge_deserializes() {
        let c: Challenge =
            serde_json::from_str(r#"{"prefix":"abc","target":"000000FF"}"#).unwrap();
        assert_eq!(c.prefix, "abc");
        assert_eq!(c.target, "000000FF");
    }
}
