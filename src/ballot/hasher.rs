//! Ballot hasher
//!
//! A vote row stores only a commitment: SHA-256 over a fixed-width
//! encoding of who voted for whom and when, mixed with 32 fresh bytes from
//! the OS CSPRNG. The salt is discarded, so the digest cannot be linked
//! back to a voter by recomputation, and two identical submissions never
//! share a digest.
//!
//! Encoding, in order:
//!
//! | field        | bytes                |
//! |--------------|----------------------|
//! | domain tag   | `DOMAIN_TAG`         |
//! | voter id     | 16 (UUID bytes)      |
//! | candidate id | 16 (UUID bytes)      |
//! | seconds      | 8, i64 little endian |
//! | nanoseconds  | 4, u32 little endian |
//! | salt         | 32                   |

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::schema::{CandidateId, CommitmentHash, VoterId};

/// Separates vote commitments from any other SHA-256 use.
pub const DOMAIN_TAG: &[u8] = b"ballotdb/vote-commitment/v1";

/// Salt length in bytes.
pub const SALT_LEN: usize = 32;

/// Stateless commitment builder.
pub struct BallotHasher;

impl BallotHasher {
    /// Draws a fresh salt from the OS CSPRNG.
    pub fn fresh_salt() -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        salt
    }

    /// Computes the commitment for one selection.
    pub fn commit(
        voter_id: &VoterId,
        candidate_id: &CandidateId,
        timestamp: DateTime<Utc>,
        salt: &[u8; SALT_LEN],
    ) -> CommitmentHash {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(voter_id.as_bytes());
        hasher.update(candidate_id.as_bytes());
        hasher.update(timestamp.timestamp().to_le_bytes());
        hasher.update(timestamp.timestamp_subsec_nanos().to_le_bytes());
        hasher.update(salt);
        CommitmentHash::from_bytes(hasher.finalize().into())
    }

    /// Computes a commitment with a fresh salt.
    pub fn commit_fresh(
        voter_id: &VoterId,
        candidate_id: &CandidateId,
        timestamp: DateTime<Utc>,
    ) -> CommitmentHash {
        Self::commit(voter_id, candidate_id, timestamp, &Self::fresh_salt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_same_inputs_same_digest() {
        let voter = VoterId::new();
        let candidate = CandidateId::new();
        let salt = [7u8; SALT_LEN];
        assert_eq!(
            BallotHasher::commit(&voter, &candidate, at(), &salt),
            BallotHasher::commit(&voter, &candidate, at(), &salt)
        );
    }

    #[test]
    fn test_fresh_salt_makes_identical_submissions_distinct() {
        let voter = VoterId::new();
        let candidate = CandidateId::new();
        let a = BallotHasher::commit_fresh(&voter, &candidate, at());
        let b = BallotHasher::commit_fresh(&voter, &candidate, at());
        assert_ne!(a, b);
    }

    #[test]
    fn test_every_field_contributes() {
        let voter = VoterId::new();
        let candidate = CandidateId::new();
        let salt = [1u8; SALT_LEN];
        let base = BallotHasher::commit(&voter, &candidate, at(), &salt);

        assert_ne!(base, BallotHasher::commit(&VoterId::new(), &candidate, at(), &salt));
        assert_ne!(base, BallotHasher::commit(&voter, &CandidateId::new(), at(), &salt));
        assert_ne!(
            base,
            BallotHasher::commit(&voter, &candidate, at() + chrono::Duration::nanoseconds(1), &salt)
        );
        assert_ne!(base, BallotHasher::commit(&voter, &candidate, at(), &[2u8; SALT_LEN]));
    }

    #[test]
    fn test_digest_renders_as_64_hex_chars() {
        let hash = BallotHasher::commit_fresh(&VoterId::new(), &CandidateId::new(), at());
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
