//! Column value types with their own format rules

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length in bytes of a vote commitment digest.
pub const COMMITMENT_HASH_LEN: usize = 32;

/// Random bytes behind a verification code.
pub const VERIFICATION_CODE_BYTES: usize = 16;

/// A 256-bit vote commitment, rendered as 64 lowercase hex characters.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitmentHash([u8; COMMITMENT_HASH_LEN]);

impl CommitmentHash {
    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; COMMITMENT_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses the hex rendering.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; COMMITMENT_HASH_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; COMMITMENT_HASH_LEN] {
        &self.0
    }

    /// Returns the hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitmentHash({})", self.to_hex())
    }
}

impl Serialize for CommitmentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CommitmentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CommitmentHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Voter-facing proof of participation.
///
/// URL-safe base64 (no padding) of `VERIFICATION_CODE_BYTES` random bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Length of the encoded code in characters.
    pub const ENCODED_LEN: usize = (VERIFICATION_CODE_BYTES * 4 + 2) / 3;

    /// Encodes raw random bytes into a code.
    pub fn from_bytes(bytes: &[u8; VERIFICATION_CODE_BYTES]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Parses a code presented by a voter.
    ///
    /// Returns `None` unless the input decodes to exactly
    /// `VERIFICATION_CODE_BYTES` bytes.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.len() != Self::ENCODED_LEN {
            return None;
        }
        match URL_SAFE_NO_PAD.decode(trimmed) {
            Ok(bytes) if bytes.len() == VERIFICATION_CODE_BYTES => Some(Self(trimmed.to_string())),
            _ => None,
        }
    }

    /// Returns the encoded code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerificationCode({})", self.0)
    }
}

impl<'de> Deserialize<'de> for VerificationCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        VerificationCode::parse(&s)
            .ok_or_else(|| serde::de::Error::custom("malformed verification code"))
    }
}
