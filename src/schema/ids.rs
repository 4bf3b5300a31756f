//! Typed row identifiers
//!
//! Every row is keyed by a random v4 UUID wrapped in a table-specific
//! newtype so an election id can never be passed where a candidate id is
//! expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the 16 raw bytes of the identifier.
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

row_id!(
    /// Election primary key.
    ElectionId
);
row_id!(
    /// Position primary key.
    PositionId
);
row_id!(
    /// Candidate row primary key.
    CandidateId
);
row_id!(
    /// Stable identity of the person standing as a candidate.
    ///
    /// Distinct from `VoterId`: a person may be both, but the roles are
    /// never conflated in the schema.
    CandidateIdentity
);
row_id!(
    /// Vote primary key.
    VoteId
);
row_id!(
    /// Participation record primary key.
    ParticipationId
);
row_id!(
    /// Voter identity as issued by the identity provider.
    VoterId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ElectionId::new(), ElectionId::new());
    }

    #[test]
    fn test_parse_round_trip() {
        let id = VoterId::new();
        let parsed: VoterId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<CandidateId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_uuid_string() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&PositionId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }
}
