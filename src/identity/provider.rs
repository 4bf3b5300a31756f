//! Identity providers
//!
//! The engine never manages accounts. It only asks whether a voter id is
//! known, which class it is, and whether it is active.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::VoterId;

use super::voter::VoterProfile;

/// Result type for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Failures loading a voter roster
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Failed to read roster {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed roster {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Voter {0} appears more than once in the roster")]
    DuplicateVoter(VoterId),
}

/// Looks up voters by id.
pub trait IdentityProvider: Send + Sync {
    /// Returns the voter's profile, or `None` if the id is unknown.
    fn get_voter(&self, voter_id: &VoterId) -> Option<VoterProfile>;
}

/// In-memory provider for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    voters: RwLock<HashMap<VoterId, VoterProfile>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a profile.
    pub fn upsert(&self, profile: VoterProfile) {
        self.voters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(profile.voter_id, profile);
    }

    /// Registers an active voter-class account and returns its id.
    pub fn register_voter(&self) -> VoterId {
        let id = VoterId::new();
        self.upsert(VoterProfile::voter(id));
        id
    }

    /// Marks a voter inactive. Returns false if the id is unknown.
    pub fn deactivate(&self, voter_id: &VoterId) -> bool {
        match self
            .voters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(voter_id)
        {
            Some(profile) => {
                profile.active = false;
                true
            }
            None => false,
        }
    }

    /// Forgets a voter entirely.
    pub fn remove(&self, voter_id: &VoterId) -> Option<VoterProfile> {
        self.voters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(voter_id)
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn get_voter(&self, voter_id: &VoterId) -> Option<VoterProfile> {
        self.voters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(voter_id)
            .cloned()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RosterFile {
    voters: Vec<VoterProfile>,
}

/// Read-only provider backed by a JSON roster file:
///
/// ```json
/// { "voters": [ { "voter_id": "…", "role": "voter", "active": true } ] }
/// ```
#[derive(Debug)]
pub struct RosterIdentityProvider {
    voters: HashMap<VoterId, VoterProfile>,
}

impl RosterIdentityProvider {
    /// Loads the roster at `path`.
    pub fn load(path: &Path) -> IdentityResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| IdentityError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let roster: RosterFile =
            serde_json::from_str(&contents).map_err(|e| IdentityError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::from_profiles(roster.voters)
    }

    /// Builds a roster from profiles; every voter id must be unique.
    pub fn from_profiles(profiles: Vec<VoterProfile>) -> IdentityResult<Self> {
        let mut voters = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            let id = profile.voter_id;
            if voters.insert(id, profile).is_some() {
                return Err(IdentityError::DuplicateVoter(id));
            }
        }
        Ok(Self { voters })
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }
}

impl IdentityProvider for RosterIdentityProvider {
    fn get_voter(&self, voter_id: &VoterId) -> Option<VoterProfile> {
        self.voters.get(voter_id).cloned()
    }
}
