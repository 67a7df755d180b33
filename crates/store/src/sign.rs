//! HMAC signing for sync journals.
//!
//! A signed journal lets an operator prove a persisted audit record was
//! not edited after the run. The signature is HMAC-SHA256 over the
//! journal's canonical JSON encoding, stored hex-encoded in a `.sig`
//! file next to the journal.

use crate::error::{StoreError, StoreResult};
use crate::journal::SyncJournal;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted signing key length in bytes
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Computes the hex HMAC-SHA256 signature of a journal
pub fn sign_journal(journal: &SyncJournal, key: &[u8]) -> StoreResult<String> {
    if key.len() < MIN_SIGNING_KEY_LEN {
        return Err(StoreError::SigningKeyTooShort(MIN_SIGNING_KEY_LEN));
    }

    let payload = serde_json::to_vec(journal)?;
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| StoreError::SigningKeyTooShort(MIN_SIGNING_KEY_LEN))?;
    mac.update(&payload);

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a stored signature against a journal.
///
/// Comparison is constant-time so verification cannot be used as a
/// timing oracle.
pub fn verify_journal_signature(
    journal: &SyncJournal,
    key: &[u8],
    signature: &str,
) -> StoreResult<bool> {
    let computed = sign_journal(journal, key)?;
    Ok(constant_time_eq(
        computed.as_bytes(),
        signature.trim().as_bytes(),
    ))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{EntryAction, SyncJournalEntry};
    use driftsync_core::{SyncDirection, VerifyPolicy};
    use driftsync_resilience::RetryPolicy;

    fn sample_journal() -> SyncJournal {
        SyncJournal::new(
            "/l",
            "/r",
            SyncDirection::Bidirectional,
            RetryPolicy::default(),
            VerifyPolicy::None,
            vec![SyncJournalEntry::new("a.txt", EntryAction::Upload)],
        )
    }

    fn key() -> Vec<u8> {
        vec![7u8; 32]
    }

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let journal = sample_journal();
        let signature = sign_journal(&journal, &key()).expect("sign");
        assert_eq!(signature.len(), 64);
        assert!(verify_journal_signature(&journal, &key(), &signature).expect("verify"));
    }

    #[test]
    fn test_tampered_journal_fails_verification() {
        let mut journal = sample_journal();
        let signature = sign_journal(&journal, &key()).expect("sign");

        journal.entries[0].bytes_transferred = 999;
        assert!(!verify_journal_signature(&journal, &key(), &signature).expect("verify"));
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let journal = sample_journal();
        let signature = sign_journal(&journal, &key()).expect("sign");
        let other_key = vec![8u8; 32];
        assert!(!verify_journal_signature(&journal, &other_key, &signature).expect("verify"));
    }

    #[test]
    fn test_short_key_rejected() {
        let journal = sample_journal();
        let result = sign_journal(&journal, &[1u8; 16]);
        assert!(matches!(result, Err(StoreError::SigningKeyTooShort(_))));
    }

    #[test]
    fn test_verification_tolerates_surrounding_whitespace() {
        let journal = sample_journal();
        let signature = sign_journal(&journal, &key()).expect("sign");
        let padded = format!("  {}\n", signature);
        assert!(verify_journal_signature(&journal, &key(), &padded).expect("verify"));
    }
}
