//! In-memory tables, secondary indexes and constraint checking
//!
//! Every row is a `VersionChain`. Indexes only ever grow: an entry is
//! added when a row is inserted and is never removed, so index lookups
//! always resolve liveness through the row's chain.
//!
//! Constraint checking runs against head state plus the earlier
//! mutations of the same batch. A batch that passes `validate` is
//! guaranteed to `apply` without error.
//!
//! A `(voter, election)` participation key stays claimed once written.
//! Purging a voter tombstones their records but never frees the key, so
//! the voter cannot cast a second ballot in the same election.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::mvcc::{CommitId, ReadView, VersionChain};
use crate::schema::{
    Candidate, CandidateId, CandidateIdentity, CommitmentHash, Election, ElectionId,
    ParticipationId, ParticipationRecord, Position, PositionId, VerificationCode, Vote, VoteId,
    VoterId,
};

use super::constraints::*;
use super::errors::ConstraintViolation;
use super::mutation::Mutation;

/// All ballot tables with their indexes.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    elections: BTreeMap<ElectionId, VersionChain<Election>>,
    positions: BTreeMap<PositionId, VersionChain<Position>>,
    candidates: BTreeMap<CandidateId, VersionChain<Candidate>>,
    votes: BTreeMap<VoteId, VersionChain<Vote>>,
    participation: BTreeMap<ParticipationId, VersionChain<ParticipationRecord>>,

    positions_by_election: HashMap<ElectionId, BTreeSet<PositionId>>,
    candidates_by_position: HashMap<PositionId, BTreeSet<CandidateId>>,
    votes_by_candidate: HashMap<CandidateId, BTreeSet<VoteId>>,
    participation_by_election: HashMap<ElectionId, BTreeSet<ParticipationId>>,
    participation_by_voter: HashMap<VoterId, BTreeSet<ParticipationId>>,

    position_titles: HashMap<(ElectionId, String), Vec<PositionId>>,
    candidate_identities: HashMap<(PositionId, CandidateIdentity), Vec<CandidateId>>,
    participation_keys: HashMap<(VoterId, ElectionId), Vec<ParticipationId>>,
    vote_hashes: HashMap<CommitmentHash, VoteId>,
    verification_codes: HashMap<VerificationCode, ParticipationId>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Constraint checking
    // ------------------------------------------------------------------

    /// Checks a staged batch against every constraint.
    pub fn validate(&self, batch: &[Mutation]) -> Result<(), ConstraintViolation> {
        let mut checker = Checker::new(self);
        for mutation in batch {
            checker.check(mutation)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Apply
    // ------------------------------------------------------------------

    /// Applies a validated batch at `commit_id`.
    pub fn apply(&mut self, commit_id: CommitId, batch: Vec<Mutation>) {
        for mutation in batch {
            match mutation {
                Mutation::PutElection(election) => {
                    let id = election.id;
                    match self.elections.get_mut(&id) {
                        Some(chain) => chain.push_row(election, commit_id),
                        None => {
                            self.elections
                                .insert(id, VersionChain::created(election, commit_id));
                        }
                    }
                }
                Mutation::InsertPosition(position) => {
                    let id = position.id;
                    self.positions_by_election
                        .entry(position.election_id)
                        .or_default()
                        .insert(id);
                    self.position_titles
                        .entry((position.election_id, position.title.clone()))
                        .or_default()
                        .push(id);
                    self.positions
                        .insert(id, VersionChain::created(position, commit_id));
                }
                Mutation::InsertCandidate(candidate) => {
                    let id = candidate.id;
                    self.candidates_by_position
                        .entry(candidate.position_id)
                        .or_default()
                        .insert(id);
                    self.candidate_identities
                        .entry((candidate.position_id, candidate.identity))
                        .or_default()
                        .push(id);
                    self.candidates
                        .insert(id, VersionChain::created(candidate, commit_id));
                }
                Mutation::InsertVote(vote) => {
                    let id = vote.id;
                    self.votes_by_candidate
                        .entry(vote.candidate_id)
                        .or_default()
                        .insert(id);
                    self.vote_hashes.insert(vote.commitment_hash, id);
                    self.votes.insert(id, VersionChain::created(vote, commit_id));
                }
                Mutation::InsertParticipation(record) => {
                    let id = record.id;
                    self.participation_by_election
                        .entry(record.election_id)
                        .or_default()
                        .insert(id);
                    self.participation_by_voter
                        .entry(record.voter_id)
                        .or_default()
                        .insert(id);
                    self.participation_keys
                        .entry((record.voter_id, record.election_id))
                        .or_default()
                        .push(id);
                    self.verification_codes
                        .insert(record.verification_code.clone(), id);
                    self.participation
                        .insert(id, VersionChain::created(record, commit_id));
                }
                Mutation::DeleteElection { id } => self.tombstone_election(id, commit_id),
                Mutation::DeletePosition { id } => self.tombstone_position(id, commit_id),
                Mutation::DeleteCandidate { id } => self.tombstone_candidate(id, commit_id),
                Mutation::PurgeVoter { voter_id } => {
                    let ids = ids_of(&self.participation_by_voter, &voter_id);
                    for id in ids {
                        tombstone_if_live(&mut self.participation, &id, commit_id);
                    }
                }
            }
        }
    }

    fn tombstone_election(&mut self, id: ElectionId, commit_id: CommitId) {
        if !tombstone_if_live(&mut self.elections, &id, commit_id) {
            return;
        }
        for position_id in ids_of(&self.positions_by_election, &id) {
            self.tombstone_position(position_id, commit_id);
        }
        for record_id in ids_of(&self.participation_by_election, &id) {
            tombstone_if_live(&mut self.participation, &record_id, commit_id);
        }
    }

    fn tombstone_position(&mut self, id: PositionId, commit_id: CommitId) {
        if !tombstone_if_live(&mut self.positions, &id, commit_id) {
            return;
        }
        for candidate_id in ids_of(&self.candidates_by_position, &id) {
            self.tombstone_candidate(candidate_id, commit_id);
        }
    }

    fn tombstone_candidate(&mut self, id: CandidateId, commit_id: CommitId) {
        if !tombstone_if_live(&mut self.candidates, &id, commit_id) {
            return;
        }
        for vote_id in ids_of(&self.votes_by_candidate, &id) {
            tombstone_if_live(&mut self.votes, &vote_id, commit_id);
        }
    }

    // ------------------------------------------------------------------
    // Reads at a view
    // ------------------------------------------------------------------

    pub fn election(&self, id: &ElectionId, view: ReadView) -> Option<&Election> {
        self.elections.get(id).and_then(|c| c.visible(view))
    }

    pub fn elections(&self, view: ReadView) -> Vec<&Election> {
        self.elections.values().filter_map(|c| c.visible(view)).collect()
    }

    pub fn position(&self, id: &PositionId, view: ReadView) -> Option<&Position> {
        self.positions.get(id).and_then(|c| c.visible(view))
    }

    pub fn positions_of(&self, election_id: &ElectionId, view: ReadView) -> Vec<&Position> {
        visible_children(&self.positions_by_election, election_id, &self.positions, view)
    }

    pub fn candidate(&self, id: &CandidateId, view: ReadView) -> Option<&Candidate> {
        self.candidates.get(id).and_then(|c| c.visible(view))
    }

    pub fn candidates_of(&self, position_id: &PositionId, view: ReadView) -> Vec<&Candidate> {
        visible_children(&self.candidates_by_position, position_id, &self.candidates, view)
    }

    pub fn votes_of(&self, candidate_id: &CandidateId, view: ReadView) -> Vec<&Vote> {
        visible_children(&self.votes_by_candidate, candidate_id, &self.votes, view)
    }

    pub fn vote_count(&self, candidate_id: &CandidateId, view: ReadView) -> u64 {
        self.votes_by_candidate
            .get(candidate_id)
            .map(|ids| {
                ids.iter()
                    .filter(|id| self.votes.get(id).and_then(|c| c.visible(view)).is_some())
                    .count() as u64
            })
            .unwrap_or(0)
    }

    pub fn participation_for(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
        view: ReadView,
    ) -> Option<&ParticipationRecord> {
        self.participation_keys
            .get(&(*voter_id, *election_id))?
            .iter()
            .find_map(|id| self.participation.get(id).and_then(|c| c.visible(view)))
    }

    /// Returns true if the voter had participated in the election by
    /// `view`, including participation later purged.
    pub fn has_participated(
        &self,
        voter_id: &VoterId,
        election_id: &ElectionId,
        view: ReadView,
    ) -> bool {
        self.participation_keys
            .get(&(*voter_id, *election_id))
            .map_or(false, |ids| {
                ids.iter()
                    .any(|id| self.participation.get(id).map_or(false, |c| c.existed_at(view)))
            })
    }

    pub fn participation_by_code(
        &self,
        code: &VerificationCode,
        view: ReadView,
    ) -> Option<&ParticipationRecord> {
        let id = self.verification_codes.get(code)?;
        self.participation.get(id).and_then(|c| c.visible(view))
    }

    pub fn participation_count(&self, election_id: &ElectionId, view: ReadView) -> u64 {
        visible_children(
            &self.participation_by_election,
            election_id,
            &self.participation,
            view,
        )
        .len() as u64
    }

    pub fn participation_of_voter(
        &self,
        voter_id: &VoterId,
        view: ReadView,
    ) -> Vec<&ParticipationRecord> {
        visible_children(&self.participation_by_voter, voter_id, &self.participation, view)
    }

    pub fn total_participation(&self, view: ReadView) -> u64 {
        self.participation
            .values()
            .filter(|c| c.visible(view).is_some())
            .count() as u64
    }

    /// Number of vote rows visible at `view`, across every election.
    pub fn total_votes(&self, view: ReadView) -> u64 {
        self.votes.values().filter(|c| c.visible(view).is_some()).count() as u64
    }
}

fn ids_of<K, I>(index: &HashMap<K, BTreeSet<I>>, key: &K) -> Vec<I>
where
    K: std::hash::Hash + Eq,
    I: Copy,
{
    index
        .get(key)
        .map(|ids| ids.iter().copied().collect())
        .unwrap_or_default()
}

fn tombstone_if_live<I: Ord, T>(
    table: &mut BTreeMap<I, VersionChain<T>>,
    id: &I,
    commit_id: CommitId,
) -> bool {
    match table.get_mut(id) {
        Some(chain) if chain.is_live() => {
            chain.push_tombstone(commit_id);
            true
        }
        _ => false,
    }
}

fn visible_children<'a, K, I, T>(
    index: &HashMap<K, BTreeSet<I>>,
    key: &K,
    table: &'a BTreeMap<I, VersionChain<T>>,
    view: ReadView,
) -> Vec<&'a T>
where
    K: std::hash::Hash + Eq,
    I: Ord,
{
    index
        .get(key)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| table.get(id).and_then(|c| c.visible(view)))
                .collect()
        })
        .unwrap_or_default()
}

/// Head state overlaid with the earlier mutations of the batch.
///
/// `None` entries in the row overlays mark rows deleted by the batch.
struct Checker<'a> {
    tables: &'a Tables,
    elections: HashMap<ElectionId, Option<&'a Election>>,
    positions: HashMap<PositionId, Option<&'a Position>>,
    candidates: HashMap<CandidateId, Option<&'a Candidate>>,
    new_votes: HashSet<VoteId>,
    new_participation: HashSet<ParticipationId>,
    position_titles: HashSet<(ElectionId, &'a str)>,
    candidate_identities: HashSet<(PositionId, CandidateIdentity)>,
    vote_hashes: HashSet<CommitmentHash>,
    participation_keys: HashSet<(VoterId, ElectionId)>,
    verification_codes: HashSet<&'a VerificationCode>,
}

impl<'a> Checker<'a> {
    fn new(tables: &'a Tables) -> Self {
        Self {
            tables,
            elections: HashMap::new(),
            positions: HashMap::new(),
            candidates: HashMap::new(),
            new_votes: HashSet::new(),
            new_participation: HashSet::new(),
            position_titles: HashSet::new(),
            candidate_identities: HashSet::new(),
            vote_hashes: HashSet::new(),
            participation_keys: HashSet::new(),
            verification_codes: HashSet::new(),
        }
    }

    fn election_live(&self, id: &ElectionId) -> bool {
        match self.elections.get(id) {
            Some(row) => row.is_some(),
            None => self.tables.elections.get(id).map_or(false, |c| c.is_live()),
        }
    }

    fn position_row(&self, id: &PositionId) -> Option<&'a Position> {
        let row = match self.positions.get(id) {
            Some(row) => *row,
            None => self.tables.positions.get(id).and_then(|c| c.head()),
        };
        row.filter(|p| self.election_live(&p.election_id))
    }

    fn candidate_row(&self, id: &CandidateId) -> Option<&'a Candidate> {
        let row = match self.candidates.get(id) {
            Some(row) => *row,
            None => self.tables.candidates.get(id).and_then(|c| c.head()),
        };
        row.filter(|c| self.position_row(&c.position_id).is_some())
    }

    fn check(&mut self, mutation: &'a Mutation) -> Result<(), ConstraintViolation> {
        match mutation {
            Mutation::PutElection(election) => {
                if !election.has_valid_window() {
                    return Err(ConstraintViolation::check(
                        ELECTION_WINDOW,
                        format!("election {} ends at or before its start", election.id),
                    ));
                }
                let exists = self.elections.contains_key(&election.id)
                    || self.tables.elections.contains_key(&election.id);
                if exists && !self.election_live(&election.id) {
                    return Err(ConstraintViolation::unique(
                        ELECTION_PKEY,
                        format!("election {} was deleted", election.id),
                    ));
                }
                self.elections.insert(election.id, Some(election));
            }

            Mutation::InsertPosition(position) => {
                if self.positions.contains_key(&position.id)
                    || self.tables.positions.contains_key(&position.id)
                {
                    return Err(ConstraintViolation::unique(
                        POSITION_PKEY,
                        format!("position {} already exists", position.id),
                    ));
                }
                if position.max_selections < 1 {
                    return Err(ConstraintViolation::check(
                        POSITION_MAX_SELECTIONS,
                        "max_selections must be at least 1",
                    ));
                }
                if !self.election_live(&position.election_id) {
                    return Err(ConstraintViolation::foreign_key(
                        POSITION_ELECTION_FK,
                        format!("election {} does not exist", position.election_id),
                    ));
                }
                let key = (position.election_id, position.title.clone());
                let taken = self
                    .tables
                    .position_titles
                    .get(&key)
                    .map_or(false, |ids| ids.iter().any(|id| self.position_row(id).is_some()))
                    || !self
                        .position_titles
                        .insert((position.election_id, position.title.as_str()));
                if taken {
                    return Err(ConstraintViolation::unique(
                        POSITION_TITLE,
                        format!("position '{}' already exists in this election", position.title),
                    ));
                }
                self.positions.insert(position.id, Some(position));
            }

            Mutation::InsertCandidate(candidate) => {
                if self.candidates.contains_key(&candidate.id)
                    || self.tables.candidates.contains_key(&candidate.id)
                {
                    return Err(ConstraintViolation::unique(
                        CANDIDATE_PKEY,
                        format!("candidate {} already exists", candidate.id),
                    ));
                }
                if self.position_row(&candidate.position_id).is_none() {
                    return Err(ConstraintViolation::foreign_key(
                        CANDIDATE_POSITION_FK,
                        format!("position {} does not exist", candidate.position_id),
                    ));
                }
                let key = (candidate.position_id, candidate.identity);
                let taken = self
                    .tables
                    .candidate_identities
                    .get(&key)
                    .map_or(false, |ids| ids.iter().any(|id| self.candidate_row(id).is_some()))
                    || !self.candidate_identities.insert(key);
                if taken {
                    return Err(ConstraintViolation::unique(
                        CANDIDATE_IDENTITY,
                        format!(
                            "candidate identity {} already stands for this position",
                            candidate.identity
                        ),
                    ));
                }
                self.candidates.insert(candidate.id, Some(candidate));
            }

            Mutation::InsertVote(vote) => {
                if self.new_votes.contains(&vote.id) || self.tables.votes.contains_key(&vote.id) {
                    return Err(ConstraintViolation::unique(
                        VOTE_PKEY,
                        format!("vote {} already exists", vote.id),
                    ));
                }
                if self.candidate_row(&vote.candidate_id).is_none() {
                    return Err(ConstraintViolation::foreign_key(
                        VOTE_CANDIDATE_FK,
                        format!("candidate {} does not exist", vote.candidate_id),
                    ));
                }
                if self.tables.vote_hashes.contains_key(&vote.commitment_hash)
                    || !self.vote_hashes.insert(vote.commitment_hash)
                {
                    return Err(ConstraintViolation::unique(
                        VOTE_COMMITMENT_HASH,
                        "commitment hash already recorded",
                    ));
                }
                self.new_votes.insert(vote.id);
            }

            Mutation::InsertParticipation(record) => {
                if self.new_participation.contains(&record.id)
                    || self.tables.participation.contains_key(&record.id)
                {
                    return Err(ConstraintViolation::unique(
                        PARTICIPATION_PKEY,
                        format!("participation record {} already exists", record.id),
                    ));
                }
                if !self.election_live(&record.election_id) {
                    return Err(ConstraintViolation::foreign_key(
                        PARTICIPATION_ELECTION_FK,
                        format!("election {} does not exist", record.election_id),
                    ));
                }
                let key = (record.voter_id, record.election_id);
                let taken = self.tables.participation_keys.contains_key(&key)
                    || !self.participation_keys.insert(key);
                if taken {
                    return Err(ConstraintViolation::unique(
                        PARTICIPATION_VOTER_ELECTION,
                        "voter already participated in this election",
                    ));
                }
                if self
                    .tables
                    .verification_codes
                    .contains_key(&record.verification_code)
                    || !self.verification_codes.insert(&record.verification_code)
                {
                    return Err(ConstraintViolation::unique(
                        PARTICIPATION_VERIFICATION_CODE,
                        "verification code already issued",
                    ));
                }
                self.new_participation.insert(record.id);
            }

            Mutation::DeleteElection { id } => {
                self.elections.insert(*id, None);
            }
            Mutation::DeletePosition { id } => {
                self.positions.insert(*id, None);
            }
            Mutation::DeleteCandidate { id } => {
                self.candidates.insert(*id, None);
            }
            Mutation::PurgeVoter { .. } => {}
        }
        Ok(())
    }
}
