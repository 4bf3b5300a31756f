//! Names of the constraints the store enforces at commit

pub const ELECTION_PKEY: &str = "election_pkey";
pub const ELECTION_WINDOW: &str = "election_window";
pub const POSITION_PKEY: &str = "position_pkey";
pub const POSITION_ELECTION_FK: &str = "position_election_fk";
pub const POSITION_TITLE: &str = "position_title";
pub const POSITION_MAX_SELECTIONS: &str = "position_max_selections";
pub const CANDIDATE_PKEY: &str = "candidate_pkey";
pub const CANDIDATE_POSITION_FK: &str = "candidate_position_fk";
pub const CANDIDATE_IDENTITY: &str = "candidate_identity";
pub const VOTE_PKEY: &str = "vote_pkey";
pub const VOTE_CANDIDATE_FK: &str = "vote_candidate_fk";
pub const VOTE_COMMITMENT_HASH: &str = "vote_commitment_hash";
pub const PARTICIPATION_PKEY: &str = "participation_pkey";
pub const PARTICIPATION_ELECTION_FK: &str = "participation_election_fk";
pub const PARTICIPATION_VOTER_ELECTION: &str = "participation_voter_election";
pub const PARTICIPATION_VERIFICATION_CODE: &str = "participation_verification_code";
